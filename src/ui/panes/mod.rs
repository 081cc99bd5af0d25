//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`source`]: Script display with syntax highlighting and current line indicator
//! - [`region`]: Stack limits, stack pointer, usage gauge and fiber list
//! - [`frames`]: Call frames and `stackSave` slots of the running fiber
//! - [`events`]: What the runtime reported, colored by severity
//! - [`status`]: Status bar with keybindings and execution state
//!
//! Each pane module exports a primary `render_*` function. Panes render from a
//! [`Snapshot`](crate::snapshot::Snapshot) so they show the state at the
//! current history position rather than the live machine.

pub mod events;
pub mod frames;
pub mod region;
pub mod source;
pub mod status;

pub use events::render_events_pane;
pub use frames::render_frames_pane;
pub use region::render_region_pane;
pub use source::{render_source_pane, SourceScrollState};
pub use status::{render_status_bar, StatusRenderData};
