//! Capability traits shared by all arena allocators.
//!
//! [`ArenaAllocator`] is what every allocator can do: allocate, reset and
//! describe itself. [`ArenaInit`] builds one over a buffer, which is how
//! [`DoubleBufferAllocator`](crate::DoubleBufferAllocator) constructs its
//! pair. [`ArenaFree`] is the optional capability of giving a single block
//! back.

use std::fmt;
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};

use crate::boxed::ArenaBox;
use crate::error::ArenaError;
use crate::region::Region;

/// An allocator handing out pieces of one caller-owned buffer.
pub trait ArenaAllocator {
    /// Allocate `bytes` bytes aligned to `align` (a power of two).
    ///
    /// The returned memory is uninitialised from the caller's point of view
    /// and stays valid until it is freed, the allocator is reset, or the
    /// buffer borrow ends.
    fn raw_alloc(&mut self, bytes: usize, align: usize) -> Result<NonNull<u8>, ArenaError>;

    /// Forget every allocation, as if freshly initialised over the same
    /// buffer. Bytes are not cleared.
    fn reset(&mut self);

    /// Address range of the managed buffer.
    fn region(&self) -> Region;

    /// Write a hex dump of the whole buffer to `out`.
    fn dump<W: fmt::Write>(&self, out: &mut W) -> fmt::Result;

    /// Give back a block owned by an [`ArenaBox`] whose value has already
    /// been dropped.
    ///
    /// Allocators without individual free keep the block until
    /// [`reset`](ArenaAllocator::reset).
    ///
    /// # Safety
    ///
    /// `ptr` must come from this allocator and must not be used afterwards.
    #[doc(hidden)]
    unsafe fn release(&mut self, ptr: NonNull<u8>) {
        let _ = ptr;
    }

    /// Allocate space for a `T` and move `value` into it.
    ///
    /// Ownership of the value passes to the caller through the returned
    /// pointer: nothing drops it unless the caller does.
    fn alloc<T>(&mut self, value: T) -> Result<NonNull<T>, ArenaError>
    where
        Self: Sized,
    {
        let ptr = self
            .raw_alloc(size_of::<T>(), align_of::<T>())?
            .cast::<T>();
        // SAFETY: `raw_alloc` returned `size_of::<T>()` writable bytes
        // aligned to `align_of::<T>()` that nothing else refers to.
        unsafe { ptr.as_ptr().write(value) };
        Ok(ptr)
    }

    /// Allocate `value` behind a scope-bound handle that drops it and
    /// releases its block when the handle goes out of scope.
    fn boxed<T>(&mut self, value: T) -> Result<ArenaBox<'_, T, Self>, ArenaError>
    where
        Self: Sized,
    {
        let ptr = self.alloc(value)?;
        // SAFETY: `ptr` was just allocated from `self` and holds `value`.
        Ok(unsafe { ArenaBox::from_raw(self, ptr) })
    }
}

/// Construction of an allocator over a caller-owned buffer.
pub trait ArenaInit<'buf>: ArenaAllocator + Sized {
    /// Initialise an allocator managing all of `buffer`.
    fn init(buffer: &'buf mut [u8]) -> Result<Self, ArenaError>;
}

/// Allocators that can give back individual blocks.
pub trait ArenaFree: ArenaAllocator {
    /// Return a block obtained from [`ArenaAllocator::raw_alloc`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator since its last reset
    /// and not freed since. Nothing may access the block afterwards. Stack
    /// allocators additionally require `ptr` to be the most recently
    /// allocated live block.
    unsafe fn raw_free(&mut self, ptr: NonNull<u8>) -> Result<(), ArenaError>;

    /// Drop the `T` at `ptr` and free its block.
    ///
    /// # Safety
    ///
    /// As for [`raw_free`](ArenaFree::raw_free), and `ptr` must hold a live
    /// `T` placed by [`ArenaAllocator::alloc`].
    unsafe fn free<T>(&mut self, ptr: NonNull<T>) -> Result<(), ArenaError>
    where
        Self: Sized,
    {
        // SAFETY: the caller guarantees `ptr` holds a live `T` owned by us.
        unsafe {
            ptr::drop_in_place(ptr.as_ptr());
            self.raw_free(ptr.cast())
        }
    }
}
