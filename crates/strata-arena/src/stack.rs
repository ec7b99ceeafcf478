//! LIFO bump allocation with in-band padding tags.
//!
//! [`StackAllocator`] is a bump allocator that can also roll its cursor
//! back, one block at a time, in reverse allocation order. To make the
//! rollback exact it records, in the byte right before every returned
//! pointer, how far the cursor was moved to reach the aligned address.

use std::fmt;
use std::ptr::NonNull;

use crate::align;
use crate::error::ArenaError;
use crate::raw::RawBuffer;
use crate::region::Region;
use crate::traits::{ArenaAllocator, ArenaFree, ArenaInit};

/// Largest shift the one-byte padding tag can record.
///
/// Because the cursor always advances by 1..=`align` bytes, alignments up
/// to 128 always fit; an alignment of 256 or more fails with
/// [`ArenaError::PaddingOverflow`] whenever the shift reaches 256.
pub const MAX_PADDING: usize = u8::MAX as usize;

/// Bump allocator with strict LIFO free.
///
/// # Layout of one allocation
///
/// ```text
///  old top              aligned (returned)          new top
///  ├── gap ───┬── tag ──┼────────── bytes ──────────┤
///             └ one byte holding (aligned - old top)
/// ```
///
/// Freeing reads the tag and moves `top` back to the old value. Only the
/// most recent live allocation may be freed; freeing anything else leaves
/// the cursor in the wrong place and is not detected.
pub struct StackAllocator<'buf> {
    buffer: RawBuffer<'buf>,
    /// Bump cursor: offset of the first unallocated byte.
    top: usize,
}

impl<'buf> StackAllocator<'buf> {
    /// Create a stack allocator managing all of `buffer`.
    pub fn new(buffer: &'buf mut [u8]) -> Self {
        let buffer = RawBuffer::new(buffer);
        tracing::debug!(region = %buffer.region(), "stack allocator initialised");
        Self { buffer, top: 0 }
    }

    /// Bytes consumed so far, padding tags included.
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

impl ArenaAllocator for StackAllocator<'_> {
    fn raw_alloc(&mut self, bytes: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        let base = self.buffer.addr();
        let top_addr = base + self.top;
        let aligned_addr = align::align_up_with_padding(top_addr, align)?;

        let shift = aligned_addr - top_addr;
        if shift > MAX_PADDING {
            return Err(ArenaError::PaddingOverflow { padding: shift });
        }

        let aligned = aligned_addr - base;
        let end = aligned
            .checked_add(bytes)
            .filter(|&end| end <= self.buffer.len())
            .ok_or(ArenaError::CapacityExceeded {
                requested: bytes,
                available: self.remaining(),
            })?;

        // shift >= 1, so the tag lands in the gap at or after the old top.
        self.buffer.write_u8(aligned - 1, shift as u8);
        self.top = end;
        tracing::trace!(offset = aligned, bytes, align, shift, "stack alloc");
        Ok(self.buffer.ptr_at(aligned))
    }

    fn reset(&mut self) {
        tracing::debug!(released = self.top, "stack allocator reset");
        self.top = 0;
    }

    fn region(&self) -> Region {
        self.buffer.region()
    }

    fn dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        self.buffer.hex_dump(out)
    }

    unsafe fn release(&mut self, ptr: NonNull<u8>) {
        // SAFETY: forwarded caller contract.
        if let Err(err) = unsafe { self.raw_free(ptr) } {
            tracing::warn!(%err, "boxed block rejected by stack");
        }
    }
}

impl ArenaFree for StackAllocator<'_> {
    unsafe fn raw_free(&mut self, ptr: NonNull<u8>) -> Result<(), ArenaError> {
        let address = ptr.as_ptr() as usize;
        let offset = self
            .buffer
            .offset_of(ptr)
            .filter(|&offset| offset > 0 && offset <= self.top)
            .ok_or(ArenaError::OutOfRange {
                address,
                region: self.region(),
            })?;

        let shift = usize::from(self.buffer.read_u8(offset - 1));
        if shift == 0 || shift > offset {
            return Err(ArenaError::InvalidPointer { address });
        }

        self.top = offset - shift;
        tracing::trace!(offset, shift, top = self.top, "stack free");
        Ok(())
    }
}

impl<'buf> ArenaInit<'buf> for StackAllocator<'buf> {
    fn init(buffer: &'buf mut [u8]) -> Result<Self, ArenaError> {
        Ok(Self::new(buffer))
    }
}
