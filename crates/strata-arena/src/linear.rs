//! Monotonic bump allocation over a caller-owned buffer.
//!
//! [`LinearAllocator`] hands out increasing offsets from a single cursor.
//! There is no per-block bookkeeping and no individual free: everything is
//! reclaimed at once by [`ArenaAllocator::reset`]. This suits
//! allocate-many, free-all-at-once patterns such as per-frame scratch data.

use std::fmt;
use std::ptr::NonNull;

use crate::align;
use crate::error::ArenaError;
use crate::raw::RawBuffer;
use crate::region::Region;
use crate::traits::{ArenaAllocator, ArenaInit};

/// Bump allocator with reset-only reclamation.
///
/// # Layout
///
/// ```text
/// base            top                      base + capacity
/// ├── allocated ──┤──────── remaining ──────┤
/// ```
///
/// Each allocation aligns `top` up (leaving it unchanged when already
/// aligned) and advances it past the requested bytes.
pub struct LinearAllocator<'buf> {
    buffer: RawBuffer<'buf>,
    /// Bump cursor: offset of the first unallocated byte.
    top: usize,
}

impl<'buf> LinearAllocator<'buf> {
    /// Create a linear allocator managing all of `buffer`.
    pub fn new(buffer: &'buf mut [u8]) -> Self {
        let buffer = RawBuffer::new(buffer);
        tracing::debug!(region = %buffer.region(), "linear allocator initialised");
        Self { buffer, top: 0 }
    }

    /// Bytes consumed so far, alignment gaps included.
    pub fn used(&self) -> usize {
        self.top
    }

    /// Bytes left between the cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.top
    }

    /// Total size of the managed buffer.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

impl ArenaAllocator for LinearAllocator<'_> {
    fn raw_alloc(&mut self, bytes: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        let base = self.buffer.addr();
        let aligned = align::align_up(base + self.top, align)? - base;
        let end = aligned
            .checked_add(bytes)
            .filter(|&end| end <= self.buffer.len())
            .ok_or(ArenaError::CapacityExceeded {
                requested: bytes,
                available: self.remaining(),
            })?;

        self.top = end;
        tracing::trace!(offset = aligned, bytes, align, "linear alloc");
        Ok(self.buffer.ptr_at(aligned))
    }

    fn reset(&mut self) {
        tracing::debug!(released = self.top, "linear allocator reset");
        self.top = 0;
    }

    fn region(&self) -> Region {
        self.buffer.region()
    }

    fn dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        self.buffer.hex_dump(out)
    }
}

impl<'buf> ArenaInit<'buf> for LinearAllocator<'buf> {
    fn init(buffer: &'buf mut [u8]) -> Result<Self, ArenaError> {
        Ok(Self::new(buffer))
    }
}
