//! Memory model for the stack bookkeeping
//!
//! This module provides the core memory abstractions:
//! - [`address`]: Pointer-width addresses (wasm32 `u32`, memory64 `u64`)
//! - [`region`]: The stack region tracker (`stack_base` / `stack_end`)
//! - [`linear`]: Linear memory size, used to validate stack placement
//!
//! # Stack Layout
//!
//! The stack grows downward inside linear memory:
//!
//! ```text
//!   0 ........ end ====== sp ------ base ........ memory size
//!              ^ low      ^ top     ^ high
//!              |<- free ->|<-used ->|
//! ```
//!
//! `free = sp - end` is the headroom before overflow.

pub mod address;
pub mod linear;
pub mod region;

pub use address::{align_up16, format_address, Address, NativeAddress, STACK_ALIGN};
pub use linear::{LinearMemory, WASM_PAGE_SIZE};
pub use region::{LinkerBounds, StackError, StackRegion, StackTracker};
