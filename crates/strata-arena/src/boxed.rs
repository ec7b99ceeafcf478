//! Scope-bound owning handle for arena allocations.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};

use crate::traits::ArenaAllocator;

/// A `T` living in an arena, dropped and released when the box goes out of
/// scope.
///
/// The box mutably borrows its allocator for its whole life, so no other
/// allocation can happen while it exists. That makes it the most recent
/// live block at drop time, which is what a [`StackAllocator`] needs to
/// free it.
///
/// For allocators without individual free ([`LinearAllocator`]), dropping
/// the box runs `T`'s destructor and leaves the bytes in place until the
/// allocator is reset.
///
/// [`StackAllocator`]: crate::StackAllocator
/// [`LinearAllocator`]: crate::LinearAllocator
#[must_use]
pub struct ArenaBox<'a, T, A: ArenaAllocator> {
    arena: &'a mut A,
    ptr: NonNull<T>,
    _owns: PhantomData<T>,
}

impl<'a, T, A: ArenaAllocator> ArenaBox<'a, T, A> {
    /// Wrap a value previously placed by [`ArenaAllocator::alloc`].
    ///
    /// # Safety
    ///
    /// `ptr` must hold a live `T` allocated from `arena` and owned by no one
    /// else.
    pub unsafe fn from_raw(arena: &'a mut A, ptr: NonNull<T>) -> Self {
        Self {
            arena,
            ptr,
            _owns: PhantomData,
        }
    }

    /// Give up ownership without dropping the value or releasing the block.
    pub fn into_raw(self) -> NonNull<T> {
        let ptr = self.ptr;
        std::mem::forget(self);
        ptr
    }

    /// Address of the boxed value.
    pub fn as_ptr(&self) -> NonNull<T> {
        self.ptr
    }
}

impl<T, A: ArenaAllocator> Deref for ArenaBox<'_, T, A> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the box owns a live, initialised `T` and the allocator is
        // borrowed, so the block cannot be reused underneath us.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T, A: ArenaAllocator> DerefMut for ArenaBox<'_, T, A> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as in `deref`, and `&mut self` makes this access unique.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T, A: ArenaAllocator> Drop for ArenaBox<'_, T, A> {
    fn drop(&mut self) {
        // SAFETY: the value is live and owned by this box; after dropping it
        // the block is handed back exactly once.
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            self.arena.release(self.ptr.cast());
        }
    }
}

impl<T: fmt::Debug, A: ArenaAllocator> fmt::Debug for ArenaBox<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
