//! Per-thread stack entry points
//!
//! The exported surface of the runtime stub: `stack_init`, the three getters
//! and `stack_set_limits`. Each thread owns a private tracker and stack
//! pointer, so threads with their own stacks never alias each other's bounds.
//!
//! Nothing runs at load time. The runtime's startup sequence calls
//! [`bootstrap`] (or [`stack_init`]) explicitly, and every getter returns
//! [`StackError::Uninitialized`] until it has.

use crate::memory::{Address, LinkerBounds, NativeAddress, StackError, StackTracker};
use std::cell::{Cell, RefCell};

thread_local! {
    static TRACKER: RefCell<StackTracker<NativeAddress>> = RefCell::new(StackTracker::new());
    static STACK_POINTER: Cell<NativeAddress> = const { Cell::new(0) };
}

/// Startup step: initialize this thread's limits and move the stack pointer
/// to the base.
pub fn bootstrap(bounds: LinkerBounds<NativeAddress>) -> Result<(), StackError> {
    stack_init(bounds)?;
    set_stack_pointer(stack_get_base()?);
    Ok(())
}

/// Initialize this thread's limits from the linker bound symbols
pub fn stack_init(bounds: LinkerBounds<NativeAddress>) -> Result<(), StackError> {
    TRACKER.with(|t| t.borrow_mut().init(bounds))
}

pub fn stack_get_base() -> Result<NativeAddress, StackError> {
    TRACKER.with(|t| t.borrow().get_base())
}

pub fn stack_get_end() -> Result<NativeAddress, StackError> {
    TRACKER.with(|t| t.borrow().get_end())
}

/// Headroom between this thread's stack pointer and `stack_end`
pub fn stack_get_free() -> Result<NativeAddress, StackError> {
    let sp = stack_pointer();
    TRACKER.with(|t| t.borrow().get_free(sp))
}

pub fn stack_set_limits(base: NativeAddress, end: NativeAddress) {
    TRACKER.with(|t| t.borrow_mut().set_limits(base, end));
}

/// This thread's stack pointer, as last set by the environment
pub fn stack_pointer() -> NativeAddress {
    STACK_POINTER.with(Cell::get)
}

pub fn set_stack_pointer(sp: NativeAddress) {
    STACK_POINTER.with(|cell| cell.set(sp));
}

/// Whether this thread has run `stack_init` (or `stack_set_limits`)
pub fn is_initialized() -> bool {
    TRACKER.with(|t| t.borrow().is_initialized())
}

/// Run `f` against this thread's tracker
pub fn with_tracker<R>(f: impl FnOnce(&StackTracker<NativeAddress>) -> R) -> R {
    TRACKER.with(|t| f(&t.borrow()))
}

/// Reset this thread to the pre-startup state
pub fn reset() {
    TRACKER.with(|t| *t.borrow_mut() = StackTracker::new());
    set_stack_pointer(NativeAddress::ZERO);
}
