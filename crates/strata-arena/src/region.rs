//! Address-range descriptors for managed buffers.

use std::fmt;

/// Address range `[base, base + len)` of a buffer managed by an allocator.
///
/// A `Region` is a plain description: it grants no access to the bytes and
/// stays valid to compare and print after the buffer is gone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
    base: usize,
    len: usize,
}

impl Region {
    /// Describe the range starting at `base` spanning `len` bytes.
    pub const fn new(base: usize, len: usize) -> Self {
        Self { base, len }
    }

    /// First address of the range.
    pub const fn base(&self) -> usize {
        self.base
    }

    /// Length of the range in bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the range is empty.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last address of the range.
    pub const fn end(&self) -> usize {
        self.base + self.len
    }

    /// Whether `address` lies inside the range.
    pub const fn contains(&self, address: usize) -> bool {
        address >= self.base && address < self.end()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.base, self.end())
    }
}
