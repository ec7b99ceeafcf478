//! Arena-specific error types.

use crate::region::Region;

/// Errors that can occur during arena operations.
///
/// A failed operation never changes the allocator's bookkeeping: the
/// cursor or header chain is exactly as it was before the call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// An alignment that is not a power of two.
    #[error("alignment {align} is not a power of two")]
    InvalidAlignment {
        /// The rejected alignment.
        align: usize,
    },
    /// Rounding an address up to an alignment would wrap around the
    /// address space.
    #[error("aligning address {address:#x} to {align} overflows")]
    AddressOverflow {
        /// Address being aligned.
        address: usize,
        /// Requested alignment.
        align: usize,
    },
    /// A bump allocator (linear or stack) ran past the end of its buffer.
    #[error("arena capacity exceeded: requested {requested} bytes, {available} bytes available")]
    CapacityExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// Bytes left between the cursor and the end of the buffer.
        available: usize,
    },
    /// No free block of a free-list allocator can hold the request.
    #[error("no free block fits {requested} bytes (largest free run {largest_free} bytes)")]
    NoFit {
        /// Number of bytes requested.
        requested: usize,
        /// Largest contiguous free run seen while scanning.
        largest_free: usize,
    },
    /// The stack allocator's one-byte padding tag cannot record the shift.
    #[error("alignment padding of {padding} bytes does not fit the one-byte shift tag")]
    PaddingOverflow {
        /// Shift that would have been needed.
        padding: usize,
    },
    /// A pointer handed back to the allocator lies outside its buffer.
    #[error("pointer {address:#x} is outside the arena region {region}")]
    OutOfRange {
        /// Address of the rejected pointer.
        address: usize,
        /// Region managed by the allocator.
        region: Region,
    },
    /// A pointer inside the buffer that does not start a live block.
    #[error("pointer {address:#x} does not refer to a live allocation")]
    InvalidPointer {
        /// Address of the rejected pointer.
        address: usize,
    },
    /// The buffer cannot hold the allocator's minimum bookkeeping.
    #[error("buffer of {len} bytes is too small, at least {min} bytes required")]
    BufferTooSmall {
        /// Length of the supplied buffer.
        len: usize,
        /// Minimum usable length.
        min: usize,
    },
}

impl ArenaError {
    /// Whether the failure is an ordinary runtime condition rather than
    /// caller misuse.
    ///
    /// Only free-list exhaustion qualifies: fragmentation can make a
    /// request unsatisfiable even when enough bytes are free in total.
    /// Everything else means the caller sized a bump buffer wrongly or
    /// broke an allocator contract.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoFit { .. })
    }
}
