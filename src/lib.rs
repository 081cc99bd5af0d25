//! # Introduction
//!
//! stackscope tracks the call-stack region of a WebAssembly module's linear
//! memory: where the stack starts (its base, the highest address), where it
//! must stop (its end, the lowest usable address) and how much room is left
//! below the current stack pointer. The region is computed once at startup
//! from the linker's `__stack_high` / `__stack_low` symbols and can be
//! replaced at any time, e.g. when switching to a fiber's stack.
//!
//! Around that tracker the crate provides a small runtime that consumes it
//! (frame pushes with overflow checks, `stackAlloc`, fibers) and a
//! time-travel inspector that drives the runtime from a trace script.
//!
//! ## Execution pipeline
//!
//! ```text
//! Script → Lexer → Parser → Statements → Machine → Snapshots → TUI
//! ```
//!
//! 1. [`memory`]: address width, 16-byte alignment and the region tracker
//!    itself ([`memory::StackTracker`]).
//! 2. [`runtime`]: execution contexts, fibers, per-thread `stack_*` entry
//!    points and the script [`runtime::engine::Machine`].
//! 3. [`script`]: tokenises a trace script and builds its statement list.
//! 4. [`snapshot`]: snapshot history with a configurable memory limit and
//!    the event log.
//! 5. [`ui`]: ratatui-based TUI; not part of the stable library API.
//! 6. [`logging`]: `env_logger` setup for the `log` facade.
//!
//! ## Address width
//!
//! Everything is generic over [`memory::Address`]. The `memory64` feature
//! switches [`memory::NativeAddress`] (used by the per-thread entry points
//! and the binary) from `u32` to `u64`.

pub mod logging;
pub mod memory;
pub mod runtime;
pub mod script;
pub mod snapshot;
pub mod ui;
