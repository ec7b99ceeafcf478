//! Manual memory arenas over caller-owned byte buffers.
//!
//! Every allocator in this crate manages a `&mut [u8]` handed to it at
//! initialization. The allocator never allocates or frees the buffer
//! itself; it only hands out pieces of it and keeps its bookkeeping
//! either in its own fields (cursors) or in-band inside the buffer
//! (padding tags, block headers).
//!
//! # Architecture
//!
//! ```text
//! DoubleBufferAllocator<A> (two generations, swapped per frame)
//! ├── current: A   ←─── receives new allocations
//! └── swapped: A   ←─── frozen previous generation, readable until next swap
//!
//! A: ArenaAllocator
//! ├── LinearAllocator  ── bump cursor, reset only
//! ├── StackAllocator   ── bump cursor + 1-byte padding tag, LIFO free
//! └── RandomAllocator  ── in-band header list, first-fit, split + forward coalesce
//! ```
//!
//! # Failure classes
//!
//! - **Misuse** (bad alignment, foreign pointer, overflowing the buffer of a
//!   bump allocator): returned as [`ArenaError`], leaving the allocator
//!   unchanged. Treat these as bugs in the caller.
//! - **Fragmentation** ([`ArenaError::NoFit`] from [`RandomAllocator`]):
//!   an ordinary, recoverable outcome. See [`ArenaError::is_recoverable`].
//!
//! # Safety
//!
//! All reads and writes of in-band bookkeeping go through the private
//! `raw` module, which bounds-checks every access. Dereferencing returned
//! pointers and freeing blocks remain `unsafe` for the caller: the
//! allocator cannot know whether a block is still referenced.
//! [`ArenaBox`] is the safe wrapper.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod align;
pub mod boxed;
pub mod double_buffer;
pub mod error;
pub mod linear;
mod raw;
pub mod random;
pub mod region;
pub mod stack;
pub mod traits;

// Public re-exports for the primary API surface.
pub use boxed::ArenaBox;
pub use double_buffer::DoubleBufferAllocator;
pub use error::ArenaError;
pub use linear::LinearAllocator;
pub use random::{BlockInfo, RandomAllocator};
pub use region::Region;
pub use stack::StackAllocator;
pub use traits::{ArenaAllocator, ArenaFree, ArenaInit};
