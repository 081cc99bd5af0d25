//! Terminal user interface built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! - **[`app`]**: application state, keyboard event loop and pane focus
//! - **[`panes`]**: render functions for each visible pane
//! - **[`theme`]**: color palette used by all panes
//!
//! Construct an [`App`] with a finished [`Machine`] and call [`App::run`].
//!
//! [`Machine`]: crate::runtime::engine::Machine
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
