//! Pointer-width abstraction for linear memory addresses
//!
//! WebAssembly linear memory is addressed with 32-bit pointers (wasm32) or
//! 64-bit pointers (memory64). Stack bookkeeping is the same arithmetic at
//! both widths, so everything above this module is generic over [`Address`].
//! The width used by the binary and the per-thread entry points is fixed once,
//! at build time, through [`NativeAddress`] (see the `memory64` feature).

use std::fmt::{Debug, Display, LowerHex};
use std::hash::Hash;

/// Alignment applied to `stack_end` by `init` and to every runtime frame
pub const STACK_ALIGN: u64 = 16;

/// Address type selected by the build configuration
#[cfg(not(feature = "memory64"))]
pub type NativeAddress = u32;

/// Address type selected by the build configuration
#[cfg(feature = "memory64")]
pub type NativeAddress = u64;

/// An unsigned, pointer-width linear memory address.
///
/// All arithmetic mirrors what the target machine does: `wrapping_*` wraps at
/// the pointer width, `checked_*` reports when it would.
pub trait Address:
    Copy + Eq + Ord + Hash + Default + Debug + Display + LowerHex + Send + Sync + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const MAX: Self;
    /// [`STACK_ALIGN`] at this width
    const STACK_ALIGN: Self;
    /// Pointer width in bytes (4 or 8)
    const BYTES: usize;

    fn to_u64(self) -> u64;
    fn from_u64(value: u64) -> Option<Self>;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
    fn checked_add(self, rhs: Self) -> Option<Self>;
    fn checked_sub(self, rhs: Self) -> Option<Self>;
    fn and(self, rhs: Self) -> Self;
    fn not(self) -> Self;

    /// `(self + align - 1) & !(align - 1)` with machine wrap-around.
    ///
    /// `align` must be a power of two.
    fn align_up(self, align: Self) -> Self {
        let mask = align.wrapping_sub(Self::ONE);
        self.wrapping_add(mask).and(mask.not())
    }

    /// Like [`Address::align_up`] but `None` instead of wrapping past `MAX`
    fn checked_align_up(self, align: Self) -> Option<Self> {
        let mask = align.wrapping_sub(Self::ONE);
        self.checked_add(mask).map(|v| v.and(mask.not()))
    }

    fn align_down(self, align: Self) -> Self {
        self.and(align.wrapping_sub(Self::ONE).not())
    }

    fn is_aligned(self, align: Self) -> bool {
        self.and(align.wrapping_sub(Self::ONE)) == Self::ZERO
    }
}

macro_rules! impl_address {
    ($ty:ty) => {
        impl Address for $ty {
            const ZERO: Self = 0;
            const ONE: Self = 1;
            const MAX: Self = <$ty>::MAX;
            const STACK_ALIGN: Self = STACK_ALIGN as $ty;
            const BYTES: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn to_u64(self) -> u64 {
                self as u64
            }

            #[inline]
            fn from_u64(value: u64) -> Option<Self> {
                <$ty>::try_from(value).ok()
            }

            #[inline]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$ty>::wrapping_add(self, rhs)
            }

            #[inline]
            fn wrapping_sub(self, rhs: Self) -> Self {
                <$ty>::wrapping_sub(self, rhs)
            }

            #[inline]
            fn checked_add(self, rhs: Self) -> Option<Self> {
                <$ty>::checked_add(self, rhs)
            }

            #[inline]
            fn checked_sub(self, rhs: Self) -> Option<Self> {
                <$ty>::checked_sub(self, rhs)
            }

            #[inline]
            fn and(self, rhs: Self) -> Self {
                self & rhs
            }

            #[inline]
            fn not(self) -> Self {
                !self
            }
        }
    };
}

impl_address!(u32);
impl_address!(u64);

/// Round up to the next multiple of 16: `(value + 15) & !15`
#[inline]
pub fn align_up16<A: Address>(value: A) -> A {
    value.align_up(A::STACK_ALIGN)
}

/// Format an address as hex, zero-padded to its pointer width
pub fn format_address<A: Address>(addr: A) -> String {
    format!("0x{:0width$x}", addr, width = A::BYTES * 2)
}
