//! Linear memory geometry
//!
//! Only the size of the module's memory matters here: stack regions (from
//! the linker or from fiber declarations) must fit inside it.

/// WebAssembly page size
pub const WASM_PAGE_SIZE: u64 = 0x1_0000;

/// Default memory size in pages (16 MiB)
pub const DEFAULT_PAGES: u64 = 256;

/// Largest page count addressable with a pointer of `address_bytes` width
pub fn max_pages(address_bytes: usize) -> u64 {
    if address_bytes >= 8 {
        // memory64 caps the index space at 2^64 bytes
        u64::MAX / WASM_PAGE_SIZE
    } else {
        // 4 GiB
        0x1_0000
    }
}

/// A module's linear memory, by size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearMemory {
    pages: u64,
}

impl LinearMemory {
    pub fn new(pages: u64) -> Self {
        LinearMemory { pages }
    }

    pub fn pages(&self) -> u64 {
        self.pages
    }

    pub fn size_bytes(&self) -> u64 {
        self.pages.saturating_mul(WASM_PAGE_SIZE)
    }

    /// Whether `[low, high]` is a well-ordered range inside this memory.
    ///
    /// `high` is a one-past-the-end address (a stack base), so it may equal
    /// the memory size.
    pub fn contains_range(&self, low: u64, high: u64) -> bool {
        low <= high && high <= self.size_bytes()
    }
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new(DEFAULT_PAGES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_sixteen_mebibytes() {
        assert_eq!(LinearMemory::default().size_bytes(), 16 * 1024 * 1024);
    }

    #[test]
    fn range_must_be_ordered_and_inside() {
        let mem = LinearMemory::new(1);
        assert!(mem.contains_range(0, WASM_PAGE_SIZE));
        assert!(mem.contains_range(0x100, 0x200));
        assert!(!mem.contains_range(0x200, 0x100));
        assert!(!mem.contains_range(0, WASM_PAGE_SIZE + 1));
    }

    #[test]
    fn max_pages_by_width() {
        assert_eq!(max_pages(4), 65536);
        assert!(max_pages(8) > max_pages(4));
    }
}
