//! First-fit free-list allocation with in-band block headers.
//!
//! [`RandomAllocator`] lets blocks be freed in any order. The buffer is
//! carved into blocks, each preceded by a header holding the offset of the
//! next header and a busy flag. The headers form an address-ordered list
//! that ends at a sentinel one past the end of the buffer:
//!
//! ```text
//! first                                                      last (sentinel)
//! ┌────────┬──────────┬────────┬────────────────┬────────┬─────┐
//! │ hdr ●──┼─ data ───│ hdr ●──┼──── data ──────│ hdr ●──┼─ .. │
//! └────────┴──────────┴────────┴────────────────┴────────┴─────┘
//!   busy                free                      busy
//! ```
//!
//! A block's size is implied by its position and the next header:
//! `next - this - HEADER_SIZE`.
//!
//! # Coalescing
//!
//! Adjacent free blocks are merged lazily and only forwards: a header
//! absorbs the free blocks that follow it. This happens while scanning
//! for an allocation and when a block is freed. Freeing a block never
//! merges it into a free block *in front of* it; that merge waits until
//! the front block is itself freed or scanned.

use std::fmt;
use std::mem::{align_of, size_of};
use std::ptr::NonNull;

use smallvec::SmallVec;

use crate::align;
use crate::error::ArenaError;
use crate::raw::RawBuffer;
use crate::region::Region;
use crate::traits::{ArenaAllocator, ArenaFree, ArenaInit};

/// Size in bytes of the in-band header in front of every block.
pub const HEADER_SIZE: usize = 2 * size_of::<usize>();

/// Alignment of every header, and therefore the alignment every block's
/// data gets without asking.
pub const HEADER_ALIGN: usize = align_of::<usize>();

/// Smallest block worth creating when splitting: a header plus one byte.
const MIN_SPLIT: usize = HEADER_SIZE + 1;

const FREE: usize = 0;
const BUSY: usize = 1;

/// Decoded block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Header {
    /// Offset of the next header, or the sentinel.
    next: usize,
    busy: bool,
}

/// Snapshot of one block in the chain, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Offset of the block's data from the start of the buffer.
    pub offset: usize,
    /// Usable bytes between the header and the next header.
    pub size: usize,
    /// Whether the block is allocated.
    pub busy: bool,
}

/// Free-list allocator supporting out-of-order free.
///
/// Allocation walks the header list from the front and takes the first
/// free block that fits (after merging any free blocks right behind it).
/// If the block is larger than needed, the tail is split off as a new free
/// block, but only when the tail can hold a header plus at least one byte;
/// otherwise the whole block is handed out.
///
/// Running out of suitable blocks returns [`ArenaError::NoFit`], which is
/// an ordinary outcome under fragmentation.
pub struct RandomAllocator<'buf> {
    buffer: RawBuffer<'buf>,
    /// Offset of the first header (the buffer start rounded up to
    /// `HEADER_ALIGN`).
    first: usize,
    /// Sentinel offset: one past the end of the buffer. Never a header.
    last: usize,
}

impl<'buf> RandomAllocator<'buf> {
    /// Create a free-list allocator managing all of `buffer`.
    ///
    /// Fails with [`ArenaError::BufferTooSmall`] if, after aligning the
    /// first header, the buffer cannot hold one header and one byte.
    pub fn new(buffer: &'buf mut [u8]) -> Result<Self, ArenaError> {
        let buffer = RawBuffer::new(buffer);
        let base = buffer.addr();
        let first = align::align_up(base, HEADER_ALIGN)? - base;
        let min = first + MIN_SPLIT;
        if buffer.len() < min {
            return Err(ArenaError::BufferTooSmall {
                len: buffer.len(),
                min,
            });
        }

        let mut arena = Self {
            last: buffer.len(),
            buffer,
            first,
        };
        arena.write_header(
            first,
            Header {
                next: arena.last,
                busy: false,
            },
        );
        tracing::debug!(region = %arena.region(), first, "random allocator initialised");
        Ok(arena)
    }

    /// Walk the block chain as it is currently linked.
    ///
    /// Adjacent free blocks that have not been merged yet show up
    /// separately.
    pub fn blocks(&self) -> SmallVec<[BlockInfo; 16]> {
        let mut blocks = SmallVec::new();
        let mut current = self.first;
        while current != self.last {
            let header = self.header(current);
            blocks.push(BlockInfo {
                offset: current + HEADER_SIZE,
                size: header.next - current - HEADER_SIZE,
                busy: header.busy,
            });
            current = header.next;
        }
        blocks
    }

    /// Total usable bytes in free blocks.
    pub fn free_bytes(&self) -> usize {
        self.blocks()
            .iter()
            .filter(|block| !block.busy)
            .map(|block| block.size)
            .sum()
    }

    /// Size of the largest free block as currently linked.
    pub fn largest_free(&self) -> usize {
        self.blocks()
            .iter()
            .filter(|block| !block.busy)
            .map(|block| block.size)
            .max()
            .unwrap_or(0)
    }

    fn header(&self, at: usize) -> Header {
        Header {
            next: self.buffer.read_word(at),
            busy: self.buffer.read_word(at + size_of::<usize>()) == BUSY,
        }
    }

    fn write_header(&mut self, at: usize, header: Header) {
        self.buffer.write_word(at, header.next);
        self.buffer.write_word(
            at + size_of::<usize>(),
            if header.busy { BUSY } else { FREE },
        );
    }

    /// Whether `next` can be the link stored in the header at `at`: past
    /// `at`, and either the sentinel or an aligned header that fits.
    fn is_link(&self, at: usize, next: usize) -> bool {
        if next <= at || next > self.last {
            return false;
        }
        next == self.last
            || (align::is_aligned(self.buffer.addr() + next, HEADER_ALIGN)
                && next
                    .checked_add(HEADER_SIZE)
                    .is_some_and(|end| end <= self.last))
    }

    fn set_busy(&mut self, at: usize, busy: bool) {
        let header = self.header(at);
        self.write_header(at, Header { busy, ..header });
    }

    /// Absorb the block after `at` if it is free. Returns whether anything
    /// was merged.
    fn coalesce(&mut self, at: usize) -> bool {
        let header = self.header(at);
        if header.next == self.last || !self.is_link(at, header.next) {
            return false;
        }
        let neighbour = self.header(header.next);
        if neighbour.busy || !self.is_link(header.next, neighbour.next) {
            return false;
        }

        self.write_header(
            at,
            Header {
                next: neighbour.next,
                busy: header.busy,
            },
        );
        if cfg!(debug_assertions) {
            // Poison the absorbed header so a stale pointer to it fails
            // validation instead of resurrecting the block.
            self.write_header(header.next, Header { next: 0, busy: false });
        }
        true
    }

    /// Data offset for `bytes` at `align` inside the free block at `at`,
    /// or `None` if it does not fit.
    ///
    /// When the natural data position (right after the header) is not
    /// aligned enough, the data moves forward far enough that the skipped
    /// space can become a free block of its own.
    fn fit(
        &self,
        at: usize,
        next: usize,
        bytes: usize,
        align: usize,
    ) -> Result<Option<usize>, ArenaError> {
        let base = self.buffer.addr();
        let natural = at + HEADER_SIZE;
        let mut data = align::align_up(base + natural, align)? - base;
        if data != natural {
            data = align::align_up(base + natural + MIN_SPLIT, align)? - base;
        }
        Ok(data
            .checked_add(bytes)
            .filter(|&end| end <= next)
            .map(|_| data))
    }

    /// Turn the free block at `at` into an allocation of `bytes` at `data`.
    fn claim(&mut self, at: usize, data: usize, bytes: usize, align: usize) -> NonNull<u8> {
        let next = self.header(at).next;
        let mut at = at;

        let lead = data - HEADER_SIZE;
        if lead != at {
            self.write_header(lead, Header { next, busy: false });
            self.write_header(at, Header { next: lead, busy: false });
            at = lead;
        }

        self.split(at, next, data + bytes, align);
        self.set_busy(at, true);
        self.buffer.ptr_at(data)
    }

    /// Split the tail starting at `end` off the block at `at` if it can
    /// form a block of at least `MIN_SPLIT` bytes.
    fn split(&mut self, at: usize, next: usize, end: usize, align: usize) {
        let base = self.buffer.addr();
        let granule = align.max(HEADER_ALIGN);
        let Ok(tail) = align::align_up(base + end, granule).map(|addr| addr - base) else {
            return;
        };
        if tail.checked_add(MIN_SPLIT).is_none_or(|min_end| min_end > next) {
            return;
        }

        self.write_header(tail, Header { next, busy: false });
        self.write_header(at, Header { next: tail, busy: false });
    }
}

impl ArenaAllocator for RandomAllocator<'_> {
    fn raw_alloc(&mut self, bytes: usize, align: usize) -> Result<NonNull<u8>, ArenaError> {
        align::check_alignment(align)?;

        let mut largest_free = 0;
        let mut current = self.first;
        while current != self.last {
            if !self.header(current).busy {
                while self.coalesce(current) {}
                let next = self.header(current).next;
                largest_free = largest_free.max(next - current - HEADER_SIZE);

                if let Some(data) = self.fit(current, next, bytes, align)? {
                    tracing::trace!(offset = data, bytes, align, "random alloc");
                    return Ok(self.claim(current, data, bytes, align));
                }
            }
            current = self.header(current).next;
        }

        tracing::debug!(
            requested = bytes,
            align,
            largest_free,
            "random allocator has no fitting block"
        );
        Err(ArenaError::NoFit {
            requested: bytes,
            largest_free,
        })
    }

    fn reset(&mut self) {
        self.write_header(
            self.first,
            Header {
                next: self.last,
                busy: false,
            },
        );
        tracing::debug!(region = %self.region(), "random allocator reset");
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
            tracing::warn!(%err, "boxed block rejected by free list");
        }
    }
}

impl ArenaFree for RandomAllocator<'_> {
    unsafe fn raw_free(&mut self, ptr: NonNull<u8>) -> Result<(), ArenaError> {
        let address = ptr.as_ptr() as usize;
        let offset = self
            .buffer
            .offset_of(ptr)
            .filter(|&offset| offset >= self.first + HEADER_SIZE && offset <= self.last)
            .ok_or(ArenaError::OutOfRange {
                address,
                region: self.region(),
            })?;

        let at = offset - HEADER_SIZE;
        if !align::is_aligned(self.buffer.addr() + at, HEADER_ALIGN) {
            return Err(ArenaError::InvalidPointer { address });
        }
        let header = self.header(at);
        if !header.busy || !self.is_link(at, header.next) {
            return Err(ArenaError::InvalidPointer { address });
        }

        while self.coalesce(at) {}
        self.set_busy(at, false);
        tracing::trace!(offset, "random free");
        Ok(())
    }
}

impl<'buf> ArenaInit<'buf> for RandomAllocator<'buf> {
    fn init(buffer: &'buf mut [u8]) -> Result<Self, ArenaError> {
        Self::new(buffer)
    }
}
