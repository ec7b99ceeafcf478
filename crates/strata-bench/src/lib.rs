//! Workload profiles and replay helpers for strata allocators.
//!
//! Provides pre-built [`WorkloadConfig`] profiles for benchmarks and
//! examples:
//!
//! - [`reference_workload`]: 64 KiB frames, 256 operations per frame
//! - [`stress_workload`]: 1 MiB frames, 4096 operations per frame
//! - [`frame_ops`]: deterministic per-frame operation script via seed
//! - [`replay`] / [`replay_allocs`]: drive an allocator through a script

#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::ops::AddAssign;
use std::ptr::NonNull;

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_arena::{ArenaAllocator, ArenaFree, DoubleBufferAllocator};

/// Shape of a synthetic per-frame allocation workload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadConfig {
    /// Size of each of the two frame buffers in bytes.
    pub frame_bytes: usize,
    /// Number of frames (double-buffer generations) to run.
    pub frames: u32,
    /// Operations (allocations and frees) generated per frame.
    pub objects_per_frame: u32,
    /// Upper bound on a single allocation request, in bytes.
    pub max_object_bytes: usize,
    /// Seed for the operation scripts.
    pub seed: u64,
}

/// Invalid [`WorkloadConfig`] values.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WorkloadError {
    /// A size or count that must be positive is zero.
    #[error("{field} must be non-zero")]
    Zero {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A single object could never fit a frame buffer.
    #[error("max_object_bytes ({max_object_bytes}) exceeds frame_bytes ({frame_bytes})")]
    ObjectTooLarge {
        /// Configured object bound.
        max_object_bytes: usize,
        /// Configured frame size.
        frame_bytes: usize,
    },
}

impl WorkloadConfig {
    /// Check that every field is usable.
    pub fn validate(&self) -> Result<(), WorkloadError> {
        for (field, value) in [
            ("frame_bytes", self.frame_bytes),
            ("frames", self.frames as usize),
            ("objects_per_frame", self.objects_per_frame as usize),
            ("max_object_bytes", self.max_object_bytes),
        ] {
            if value == 0 {
                return Err(WorkloadError::Zero { field });
            }
        }
        if self.max_object_bytes > self.frame_bytes {
            return Err(WorkloadError::ObjectTooLarge {
                max_object_bytes: self.max_object_bytes,
                frame_bytes: self.frame_bytes,
            });
        }
        Ok(())
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        reference_workload(42)
    }
}

/// Reference profile: 64 KiB frames, 120 frames, 256 ops per frame,
/// objects up to 128 bytes.
pub fn reference_workload(seed: u64) -> WorkloadConfig {
    WorkloadConfig {
        frame_bytes: 64 * 1024,
        frames: 120,
        objects_per_frame: 256,
        max_object_bytes: 128,
        seed,
    }
}

/// Stress profile: 1 MiB frames, 600 frames, 4096 ops per frame, objects
/// up to 512 bytes.
pub fn stress_workload(seed: u64) -> WorkloadConfig {
    WorkloadConfig {
        frame_bytes: 1024 * 1024,
        frames: 600,
        objects_per_frame: 4096,
        max_object_bytes: 512,
        seed,
    }
}

/// One scripted allocator operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Allocate `bytes` at `align`.
    Alloc {
        /// Requested size.
        bytes: usize,
        /// Requested alignment (power of two).
        align: usize,
    },
    /// Free one live block; `pick` selects which when the order allows a
    /// choice.
    Free {
        /// Selector, reduced modulo the number of live blocks.
        pick: usize,
    },
}

/// Which live block a [`Op::Free`] releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FreeOrder {
    /// Any live block, chosen by the op's `pick`.
    Any,
    /// Always the most recent live block.
    Lifo,
}

/// Outcome counters of a replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Successful allocations.
    pub allocated: usize,
    /// Successful frees.
    pub freed: usize,
    /// Rejected allocations.
    pub failed: usize,
    /// Bytes requested by successful allocations.
    pub bytes: usize,
}

impl AddAssign for ReplayStats {
    fn add_assign(&mut self, rhs: Self) {
        self.allocated += rhs.allocated;
        self.freed += rhs.freed;
        self.failed += rhs.failed;
        self.bytes += rhs.bytes;
    }
}

/// Generate the deterministic operation script for one frame.
///
/// Roughly a third of the operations are frees once something is live.
/// Alignments range over 1..=16.
pub fn frame_ops(config: &WorkloadConfig, frame: u32) -> Vec<Op> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed ^ u64::from(frame));
    let mut ops = Vec::with_capacity(config.objects_per_frame as usize);
    let mut live = 0usize;

    for _ in 0..config.objects_per_frame {
        let roll = rng.next_u32();
        if live > 0 && roll % 3 == 0 {
            ops.push(Op::Free {
                pick: (roll >> 2) as usize,
            });
            live -= 1;
        } else {
            let bytes = 1 + rng.next_u32() as usize % config.max_object_bytes;
            let align = 1usize << (rng.next_u32() % 5);
            ops.push(Op::Alloc { bytes, align });
            live += 1;
        }
    }
    ops
}

/// Run `ops` against a freeing allocator.
///
/// Failed allocations are counted, not fatal: under fragmentation a free
/// list is expected to reject some requests.
#[allow(unsafe_code)]
pub fn replay<A: ArenaFree>(arena: &mut A, ops: &[Op], order: FreeOrder) -> ReplayStats {
    let mut stats = ReplayStats::default();
    let mut live: Vec<NonNull<u8>> = Vec::new();

    for op in ops {
        match *op {
            Op::Alloc { bytes, align } => match arena.raw_alloc(bytes, align) {
                Ok(ptr) => {
                    live.push(ptr);
                    stats.allocated += 1;
                    stats.bytes += bytes;
                }
                Err(err) => {
                    tracing::trace!(%err, bytes, align, "replay allocation rejected");
                    stats.failed += 1;
                }
            },
            Op::Free { pick } => {
                if live.is_empty() {
                    continue;
                }
                let index = match order {
                    FreeOrder::Any => pick % live.len(),
                    FreeOrder::Lifo => live.len() - 1,
                };
                let ptr = live.swap_remove(index);
                // SAFETY: `ptr` came from `arena`, is removed from the live
                // set so it is freed once, and under `Lifo` it is the most
                // recent live block.
                match unsafe { arena.raw_free(ptr) } {
                    Ok(()) => stats.freed += 1,
                    Err(err) => tracing::warn!(%err, "replay free rejected"),
                }
            }
        }
    }
    stats
}

/// Run only the allocations of `ops`, for allocators without free.
pub fn replay_allocs<A: ArenaAllocator>(arena: &mut A, ops: &[Op]) -> ReplayStats {
    let mut stats = ReplayStats::default();
    for op in ops {
        if let Op::Alloc { bytes, align } = *op {
            match arena.raw_alloc(bytes, align) {
                Ok(_) => {
                    stats.allocated += 1;
                    stats.bytes += bytes;
                }
                Err(_) => stats.failed += 1,
            }
        }
    }
    stats
}

/// Run every frame of `config` through a double buffer, swapping after
/// each frame.
pub fn run_frames<A: ArenaFree>(
    buffers: &mut DoubleBufferAllocator<A>,
    config: &WorkloadConfig,
    order: FreeOrder,
) -> ReplayStats {
    let mut total = ReplayStats::default();
    for frame in 0..config.frames {
        let ops = frame_ops(config, frame);
        let stats = replay(buffers.current_mut(), &ops, order);
        tracing::debug!(frame, ?stats, "frame replayed");
        total += stats;
        buffers.swap();
    }
    total
}
