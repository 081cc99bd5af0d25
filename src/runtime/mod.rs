//! Stack runtime around the region tracker
//!
//! This module provides the code that consumes the tracker:
//! - [`context`]: One execution context's stack (frames, overflow checks,
//!   `stackAlloc` / `stackSave` / `stackRestore`)
//! - [`fiber`]: Alternate stacks and the switch that swaps limits
//! - [`bootstrap`]: Per-thread `stack_*` entry points and the explicit
//!   startup call
//! - [`engine`]: Script execution with snapshot history
//! - [`errors`]: Runtime error types
//!
//! # Execution Model
//!
//! The [`engine::Machine`] executes one script statement at a time against an
//! [`context::ExecutionContext`]. After each statement a snapshot is taken so
//! the run can be replayed backward and forward.

pub mod bootstrap;
pub mod constants;
pub mod context;
pub mod engine;
pub mod errors;
pub mod fiber;
