//! Double-buffered per-frame allocation example.
//!
//! Demonstrates: build workload → two frame buffers → allocate this frame's
//! data → read last frame's data → swap → repeat.

use std::ptr::NonNull;

use strata_arena::{ArenaAllocator, DoubleBufferAllocator, RandomAllocator};
use strata_bench::{frame_ops, reference_workload, replay, FreeOrder};

/// Per-frame record that the next frame reads back.
#[derive(Debug, Clone, Copy)]
struct FrameSummary {
    frame: u32,
    allocated: usize,
    failed: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Strata Frame Loop Example ===\n");

    let config = reference_workload(42);
    config.validate().unwrap();

    let mut front = vec![0u8; config.frame_bytes];
    let mut back = vec![0u8; config.frame_bytes];
    let mut buffers =
        DoubleBufferAllocator::<RandomAllocator>::init(&mut front, &mut back).unwrap();

    let mut previous: Option<NonNull<FrameSummary>> = None;
    for frame in 0..8 {
        let ops = frame_ops(&config, frame);
        let stats = replay(buffers.current_mut(), &ops, FreeOrder::Any);

        if let Some(prev) = previous {
            // SAFETY: last frame's summary lives in the swapped buffer, which
            // is not reset until the next swap.
            let prev = unsafe { prev.as_ptr().read() };
            println!(
                "  frame {} sees frame {}: {} allocated, {} failed",
                frame, prev.frame, prev.allocated, prev.failed
            );
        }

        let summary = FrameSummary {
            frame,
            allocated: stats.allocated,
            failed: stats.failed,
        };
        previous = Some(buffers.current_mut().alloc(summary).unwrap());

        let current = buffers.current();
        println!(
            "frame {frame}: {} free bytes, largest hole {}, {} blocks",
            current.free_bytes(),
            current.largest_free(),
            current.blocks().len()
        );
        buffers.swap();
    }

    println!("\n{} generations, regions {:?}", buffers.generation(), buffers.regions());

    let mut dump = String::new();
    buffers.swapped().dump(&mut dump).unwrap();
    println!("\nlast frame buffer (first line):");
    println!("{}", dump.lines().next().unwrap_or_default());
}
