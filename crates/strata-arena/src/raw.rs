//! Low-level access to a caller-owned byte buffer.
//!
//! This is the only module that turns offsets into pointers. Every accessor
//! checks its offset against the buffer length before touching memory, so
//! corrupted in-band bookkeeping can produce wrong answers but never an
//! out-of-bounds access.
//!
//! The buffer is held as a raw base pointer rather than a `&mut [u8]`:
//! pointers handed out to callers and the allocator's own bookkeeping
//! writes must not be invalidated by a unique borrow of the whole slice.

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr::NonNull;

use crate::region::Region;

/// Exclusive view of a caller-owned buffer, addressed by byte offset.
pub(crate) struct RawBuffer<'buf> {
    base: NonNull<u8>,
    len: usize,
    _buffer: PhantomData<&'buf mut [u8]>,
}

impl<'buf> RawBuffer<'buf> {
    /// Take over `buffer` for the lifetime `'buf`.
    pub(crate) fn new(buffer: &'buf mut [u8]) -> Self {
        let len = buffer.len();
        Self {
            base: NonNull::from(buffer).cast::<u8>(),
            len,
            _buffer: PhantomData,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Absolute address of offset 0.
    pub(crate) fn addr(&self) -> usize {
        self.base.as_ptr() as usize
    }

    pub(crate) fn region(&self) -> Region {
        Region::new(self.addr(), self.len)
    }

    /// Pointer to `offset`; one-past-the-end is allowed.
    ///
    /// # Panics
    ///
    /// Panics if `offset > len`.
    pub(crate) fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        assert!(offset <= self.len, "offset {offset} beyond buffer of {} bytes", self.len);
        // SAFETY: `offset <= len`, so the result stays within (or one past
        // the end of) the allocation `base` was derived from.
        unsafe { self.base.add(offset) }
    }

    /// Offset of `ptr` from the start of the buffer, if it lies in
    /// `[base, base + len]`.
    pub(crate) fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let offset = (ptr.as_ptr() as usize).checked_sub(self.addr())?;
        (offset <= self.len).then_some(offset)
    }

    pub(crate) fn read_u8(&self, offset: usize) -> u8 {
        self.check(offset, 1);
        // SAFETY: bounds checked above; `u8` has no alignment requirement.
        unsafe { self.base.add(offset).read() }
    }

    pub(crate) fn write_u8(&mut self, offset: usize, value: u8) {
        self.check(offset, 1);
        // SAFETY: bounds checked above; the buffer is exclusively ours for `'buf`.
        unsafe { self.base.add(offset).write(value) }
    }

    pub(crate) fn read_word(&self, offset: usize) -> usize {
        self.check(offset, size_of::<usize>());
        // SAFETY: bounds checked above; unaligned read tolerates any offset.
        unsafe { self.base.add(offset).cast::<usize>().read_unaligned() }
    }

    pub(crate) fn write_word(&mut self, offset: usize, value: usize) {
        self.check(offset, size_of::<usize>());
        // SAFETY: bounds checked above; unaligned write tolerates any offset.
        unsafe { self.base.add(offset).cast::<usize>().write_unaligned(value) }
    }

    /// Hex-dump the whole buffer, one space before every machine word,
    /// followed by a size footer.
    pub(crate) fn hex_dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        for offset in 0..self.len {
            if offset % size_of::<usize>() == 0 {
                out.write_char(' ')?;
            }
            write!(out, "{:02x}", self.read_u8(offset))?;
        }
        write!(out, "\n --- dumped {} bytes --- \n", self.len)
    }

    fn check(&self, offset: usize, width: usize) {
        let in_bounds = offset.checked_add(width).is_some_and(|end| end <= self.len);
        assert!(
            in_bounds,
            "access of {width} bytes at offset {offset} beyond buffer of {} bytes",
            self.len
        );
    }
}
