//! Two-generation double buffering over a pair of allocators.
//!
//! [`DoubleBufferAllocator`] keeps two allocators of the same kind, each
//! over its own buffer. One is *current* (receives new allocations), the
//! other is *swapped* (holds the previous generation, left readable). On
//! [`DoubleBufferAllocator::swap`], the roles exchange and the newly
//! current allocator is reset, so its old contents are gone.
//!
//! The lifecycle per frame is:
//! 1. allocate this frame's data from `current_mut()`
//! 2. read last frame's data through pointers into `swapped()`'s buffer
//! 3. `swap()` — this frame becomes last frame; the buffer two frames old
//!    is wiped and reused
//!
//! There is no copy between the buffers. Data needed for longer than one
//! extra generation must be copied out before the second swap.

use crate::error::ArenaError;
use crate::region::Region;
use crate::traits::{ArenaAllocator, ArenaInit};

/// Pair of allocators alternating between current and swapped roles.
///
/// # Buffer layout
///
/// ```text
/// generation:    0          1          2          3
/// buffer A:   current    swapped    current    swapped
/// buffer B:   swapped    current    swapped    current
/// ```
///
/// Each time a buffer becomes current it is reset first, except at
/// generation 0 where both start empty.
pub struct DoubleBufferAllocator<A> {
    current: A,
    swapped: A,
    /// Descriptors of the two buffers, in role order (current, swapped).
    regions: (Region, Region),
    /// Number of swaps performed.
    generation: u64,
}

impl<A: ArenaAllocator> DoubleBufferAllocator<A> {
    /// Initialise both allocators, `first` as current and `second` as
    /// swapped.
    pub fn init<'buf>(first: &'buf mut [u8], second: &'buf mut [u8]) -> Result<Self, ArenaError>
    where
        A: ArenaInit<'buf>,
    {
        let current = A::init(first)?;
        let swapped = A::init(second)?;
        Ok(Self::new(current, swapped))
    }

    /// Wrap two already initialised allocators.
    pub fn new(current: A, swapped: A) -> Self {
        let regions = (current.region(), swapped.region());
        tracing::debug!(
            current = %regions.0,
            swapped = %regions.1,
            "double buffer initialised"
        );
        Self {
            current,
            swapped,
            regions,
            generation: 0,
        }
    }

    /// Allocator receiving this generation's allocations.
    pub fn current(&self) -> &A {
        &self.current
    }

    /// Mutable access to the current allocator.
    pub fn current_mut(&mut self) -> &mut A {
        &mut self.current
    }

    /// Allocator holding the previous generation.
    pub fn swapped(&self) -> &A {
        &self.swapped
    }

    /// Mutable access to the swapped allocator.
    ///
    /// Allocating here is allowed but the data only survives until the
    /// next swap, which resets this allocator.
    pub fn swapped_mut(&mut self) -> &mut A {
        &mut self.swapped
    }

    /// Exchange the roles and reset the newly current allocator.
    ///
    /// Pointers into the allocator that was swapped before this call are
    /// invalid afterwards; pointers into the previously current one stay
    /// valid until the next swap.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.swapped);
        self.regions = (self.regions.1, self.regions.0);
        self.current.reset();
        self.generation = self.generation.wrapping_add(1);
        tracing::debug!(
            generation = self.generation,
            current = %self.regions.0,
            swapped = %self.regions.1,
            "double buffer swapped"
        );
    }

    /// Descriptors of the (current, swapped) buffers.
    pub fn regions(&self) -> (Region, Region) {
        self.regions
    }

    /// Number of swaps since initialisation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Give back both allocators as (current, swapped).
    pub fn into_inner(self) -> (A, A) {
        (self.current, self.swapped)
    }
}
