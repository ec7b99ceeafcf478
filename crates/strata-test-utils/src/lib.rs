//! Test utilities for strata development.
//!
//! Provides [`AlignedBuf`], a fixed-size byte buffer with a known base
//! alignment so offset arithmetic in allocator tests is deterministic, and
//! the drop-tracking fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{DropTracker, Tracked};

/// Byte buffer of `N` bytes whose first byte is 64-byte aligned.
///
/// `Vec<u8>` only guarantees alignment 1, which makes expected offsets in
/// allocator tests depend on where the heap happened to put the buffer.
#[repr(C, align(64))]
pub struct AlignedBuf<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> AlignedBuf<N> {
    /// Alignment of the first byte.
    pub const ALIGN: usize = 64;

    pub fn new() -> Self {
        Self { bytes: [0; N] }
    }

    /// Buffer filled with `byte`, for spotting untouched memory in dumps.
    pub fn filled(byte: u8) -> Self {
        Self { bytes: [byte; N] }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Address of the first byte.
    pub fn addr(&self) -> usize {
        self.bytes.as_ptr() as usize
    }
}

impl<const N: usize> Default for AlignedBuf<N> {
    fn default() -> Self {
        Self::new()
    }
}
