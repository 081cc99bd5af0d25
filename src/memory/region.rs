//! Stack region tracking
//!
//! This module holds the two words of stack bookkeeping a WebAssembly module
//! keeps about its own call stack:
//! - `stack_base`: the high address the stack grows down from
//! - `stack_end`: the lowest address the stack may occupy
//!
//! [`StackRegion`] is the bare, always-initialized pair with the contract's
//! accessors. [`StackTracker`] wraps it in the "nothing until `init`"
//! lifecycle and refuses reads before initialization.
//!
//! # Contract
//!
//! ```text
//! init(high, low)      base = high, end = (low + 15) & !15
//! get_free(sp)         sp - end    (wrapping, pointer width)
//! set_limits(b, e)     base = b, end = e    (no alignment)
//! ```
//!
//! Deciding that the stack overflowed is up to the caller; the region only
//! supplies the headroom arithmetic.

use super::address::{align_up16, format_address, Address};
use std::fmt;

/// The two linker-provided stack bound symbols of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkerBounds<A> {
    /// High bound (`__stack_high`)
    pub high: A,
    /// Low bound (`__stack_low`), not necessarily aligned
    pub low: A,
}

impl<A: Address> LinkerBounds<A> {
    pub fn new(high: A, low: A) -> Self {
        LinkerBounds { high, low }
    }
}

/// Bounds of a downward-growing stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion<A> {
    base: A,
    end: A,
}

impl<A: Address> StackRegion<A> {
    /// Initialize from the linker bound symbols.
    ///
    /// The low bound is rounded up to a 16-byte boundary; the high bound is
    /// taken as is.
    pub fn init(bounds: LinkerBounds<A>) -> Self {
        StackRegion {
            base: bounds.high,
            end: align_up16(bounds.low),
        }
    }

    /// A region with exactly these limits, no alignment applied
    pub fn with_limits(base: A, end: A) -> Self {
        StackRegion { base, end }
    }

    pub fn base(&self) -> A {
        self.base
    }

    pub fn end(&self) -> A {
        self.end
    }

    /// Bytes of headroom left below `stack_pointer`.
    ///
    /// Wrapping subtraction: a stack pointer already below `end` yields a huge
    /// value, exactly like the unsigned machine op.
    pub fn free(&self, stack_pointer: A) -> A {
        stack_pointer.wrapping_sub(self.end)
    }

    /// Overwrite both limits
    pub fn set_limits(&mut self, base: A, end: A) {
        self.base = base;
        self.end = end;
    }

    /// Total size in bytes (wrapping if the region is inverted)
    pub fn size(&self) -> A {
        self.base.wrapping_sub(self.end)
    }

    pub fn is_inverted(&self) -> bool {
        self.base < self.end
    }

    /// Whether `addr` lies within `[end, base]`
    pub fn contains(&self, addr: A) -> bool {
        self.end <= addr && addr <= self.base
    }
}

impl<A: Address> fmt::Display for StackRegion<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} .. {}]",
            format_address(self.end),
            format_address(self.base)
        )
    }
}

/// Misuse of the tracker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// An accessor ran before `init`
    Uninitialized,
    /// `init` ran twice on the same tracker
    AlreadyInitialized,
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::Uninitialized => write!(f, "stack limits read before stack_init"),
            StackError::AlreadyInitialized => write!(f, "stack_init called more than once"),
        }
    }
}

impl std::error::Error for StackError {}

/// Stack bookkeeping for one execution context.
///
/// Starts empty. `init` fills it from the linker bounds, `set_limits` may
/// replace the limits at any point afterwards (for example when switching to
/// a fiber with its own stack).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTracker<A> {
    region: Option<StackRegion<A>>,
}

impl<A: Address> StackTracker<A> {
    pub fn new() -> Self {
        StackTracker { region: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.region.is_some()
    }

    /// Run the startup initialization. Fails if the tracker already holds
    /// limits, whether from an earlier `init` or from `set_limits`.
    pub fn init(&mut self, bounds: LinkerBounds<A>) -> Result<(), StackError> {
        if self.region.is_some() {
            log::warn!("stack_init called on an initialized tracker");
            return Err(StackError::AlreadyInitialized);
        }
        let region = StackRegion::init(bounds);
        log::debug!(
            "stack_init: base={} end={} (low bound {})",
            format_address(region.base()),
            format_address(region.end()),
            format_address(bounds.low)
        );
        self.region = Some(region);
        Ok(())
    }

    pub fn region(&self) -> Result<&StackRegion<A>, StackError> {
        self.region.as_ref().ok_or(StackError::Uninitialized)
    }

    pub fn get_base(&self) -> Result<A, StackError> {
        self.region().map(StackRegion::base)
    }

    pub fn get_end(&self) -> Result<A, StackError> {
        self.region().map(StackRegion::end)
    }

    pub fn get_free(&self, stack_pointer: A) -> Result<A, StackError> {
        self.region().map(|r| r.free(stack_pointer))
    }

    /// Overwrite both limits. Both words are fully defined afterwards, so this
    /// also counts as initialization.
    pub fn set_limits(&mut self, base: A, end: A) {
        if base < end {
            log::warn!(
                "stack_set_limits with inverted region: base={} end={}",
                format_address(base),
                format_address(end)
            );
        }
        log::trace!(
            "stack_set_limits: base={} end={}",
            format_address(base),
            format_address(end)
        );
        match self.region.as_mut() {
            Some(region) => region.set_limits(base, end),
            None => self.region = Some(StackRegion::with_limits(base, end)),
        }
    }
}

impl<A: Address> Default for StackTracker<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_keeps_base_and_aligns_end() {
        let region = StackRegion::init(LinkerBounds::new(0x5_0000u32, 0x4_0008));
        assert_eq!(region.base(), 0x5_0000);
        assert_eq!(region.end(), 0x4_0010);
        assert!(region.base() >= region.end());
        assert_eq!(region.end() % 16, 0);
    }

    #[test]
    fn init_does_not_align_base() {
        let region = StackRegion::init(LinkerBounds::new(0x5_0004u64, 0x4_0000));
        assert_eq!(region.base(), 0x5_0004);
        assert_eq!(region.end(), 0x4_0000);
    }

    #[test]
    fn set_limits_is_exact() {
        let mut region = StackRegion::init(LinkerBounds::new(0x5_0000u32, 0x4_0000));
        region.set_limits(0x3_0007, 0x2_0003);
        assert_eq!(region.base(), 0x3_0007);
        assert_eq!(region.end(), 0x2_0003);
    }

    #[test]
    fn free_is_stack_pointer_minus_end() {
        let region = StackRegion::with_limits(2000u32, 1000);
        assert_eq!(region.free(1200), 200);
        assert_eq!(region.free(1000), 0);
    }

    #[test]
    fn free_wraps_below_end() {
        let region = StackRegion::with_limits(2000u32, 1000);
        assert_eq!(region.free(999), u32::MAX);
    }

    #[test]
    fn reads_are_stable() {
        let region = StackRegion::init(LinkerBounds::new(0x9000u32, 0x1001));
        assert_eq!(region.base(), region.base());
        assert_eq!(region.end(), region.end());
        assert_eq!(region.free(0x8000), region.free(0x8000));
    }

    #[test]
    fn tracker_refuses_reads_before_init() {
        let tracker: StackTracker<u32> = StackTracker::new();
        assert_eq!(tracker.get_base(), Err(StackError::Uninitialized));
        assert_eq!(tracker.get_end(), Err(StackError::Uninitialized));
        assert_eq!(tracker.get_free(100), Err(StackError::Uninitialized));
    }

    #[test]
    fn tracker_init_once() {
        let mut tracker = StackTracker::new();
        let bounds = LinkerBounds::new(0x5_0000u64, 0x4_0001);
        assert!(tracker.init(bounds).is_ok());
        assert_eq!(tracker.init(bounds), Err(StackError::AlreadyInitialized));
        assert_eq!(tracker.get_base(), Ok(0x5_0000));
        assert_eq!(tracker.get_end(), Ok(0x4_0010));
    }

    #[test]
    fn tracker_set_limits_defines_region() {
        let mut tracker = StackTracker::new();
        tracker.set_limits(1200u32, 1000);
        assert!(tracker.is_initialized());
        assert_eq!(tracker.get_free(1100), Ok(100));
        assert_eq!(
            tracker.init(LinkerBounds::new(10, 0)),
            Err(StackError::AlreadyInitialized)
        );
    }

    #[test]
    fn region_display() {
        let region = StackRegion::with_limits(0x200u32, 0x100);
        assert_eq!(region.to_string(), "[0x00000100 .. 0x00000200]");
    }
}
