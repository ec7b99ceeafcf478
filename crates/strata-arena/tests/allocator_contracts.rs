//! Integration tests: the behavioural contracts shared by the allocators.
//!
//! Each scenario here is a canonical regression for one allocator family:
//! coalescing of adjacent frees, exhaustion under fragmentation, the
//! smaller-second-buffer double buffer, and destructor balance for typed
//! LIFO allocation.

use std::ptr::NonNull;

use strata_arena::random::HEADER_SIZE;
use strata_arena::{
    ArenaAllocator, ArenaError, ArenaFree, ArenaInit, DoubleBufferAllocator, LinearAllocator,
    RandomAllocator, StackAllocator,
};
use strata_test_utils::{AlignedBuf, DropTracker};

const H: usize = HEADER_SIZE;

fn offset_of<A: ArenaAllocator>(arena: &A, ptr: NonNull<u8>) -> usize {
    ptr.as_ptr() as usize - arena.region().base()
}

// ── RandomAllocator ──────────────────────────────────────────────────

#[test]
fn freeing_two_middle_blocks_serves_a_merged_request() {
    let mut buf = AlignedBuf::<256>::new();
    let mut arena = RandomAllocator::new(buf.as_mut_slice()).unwrap();

    let a = arena.raw_alloc(32, 1).unwrap();
    let b = arena.raw_alloc(32, 1).unwrap();
    let c = arena.raw_alloc(32, 1).unwrap();
    let d = arena.raw_alloc(32, 1).unwrap();

    // Mark the outer blocks so we can see they survive.
    // SAFETY: `a` and `d` are live 32-byte blocks.
    unsafe {
        a.as_ptr().write_bytes(0xaa, 32);
        d.as_ptr().write_bytes(0xdd, 32);
    }

    // SAFETY: live blocks, each freed once.
    unsafe {
        arena.raw_free(b).unwrap();
        arena.raw_free(c).unwrap();
    }

    let merged = arena.raw_alloc(64 - H, 1).unwrap();
    assert_eq!(merged, b, "first fit lands on the merged middle blocks");

    let blocks = arena.blocks();
    let a_block = blocks
        .iter()
        .find(|blk| blk.offset == offset_of(&arena, a))
        .unwrap();
    let d_block = blocks
        .iter()
        .find(|blk| blk.offset == offset_of(&arena, d))
        .unwrap();
    assert!(a_block.busy && a_block.size == 32);
    assert!(d_block.busy && d_block.size == 32);

    // SAFETY: `a` and `d` are still live.
    unsafe {
        assert!(std::slice::from_raw_parts(a.as_ptr(), 32).iter().all(|&x| x == 0xaa));
        assert!(std::slice::from_raw_parts(d.as_ptr(), 32).iter().all(|&x| x == 0xdd));
    }
}

#[test]
fn request_larger_than_any_free_run_fails() {
    let mut buf = AlignedBuf::<512>::new();
    let mut arena = RandomAllocator::new(buf.as_mut_slice()).unwrap();

    let blocks: Vec<_> = (0..8).map(|_| arena.raw_alloc(40, 8).unwrap()).collect();
    for p in blocks.iter().step_by(2) {
        // SAFETY: every other block freed once; the busy ones in between
        // keep the free runs apart.
        unsafe { arena.raw_free(*p).unwrap() };
    }

    let largest = arena.largest_free();
    let request = largest + 8;
    assert!(arena.free_bytes() >= request);

    match arena.raw_alloc(request, 8) {
        Err(err @ ArenaError::NoFit { .. }) => assert!(err.is_recoverable()),
        other => panic!("expected NoFit, got {other:?}"),
    }

    // The failure left the chain usable.
    assert!(arena.raw_alloc(largest, 8).is_ok());
}

#[test]
fn free_before_predecessor_stays_fragmented() {
    let mut buf = AlignedBuf::<256>::new();
    let mut arena = RandomAllocator::new(buf.as_mut_slice()).unwrap();

    let a = arena.raw_alloc(32, 1).unwrap();
    let b = arena.raw_alloc(32, 1).unwrap();
    let _c = arena.raw_alloc(32, 1).unwrap();

    // SAFETY: live blocks, each freed once.
    unsafe {
        arena.raw_free(b).unwrap();
        arena.raw_free(a).unwrap();
    }
    // Freeing `a` after `b` merges forward into `b`.
    let blocks = arena.blocks();
    assert_eq!(blocks[0].size, 32 + H + 32);
    assert!(!blocks[0].busy);

    let d = arena.raw_alloc(32, 1).unwrap();
    let e = arena.raw_alloc(32, 1).unwrap();
    assert_eq!((d, e), (a, b));

    // Reverse order: `d` freed while `e` is busy, then `e` freed. No
    // backward merge happens, so the chain keeps two free blocks.
    // SAFETY: live blocks, each freed once.
    unsafe {
        arena.raw_free(d).unwrap();
        arena.raw_free(e).unwrap();
    }
    let blocks = arena.blocks();
    assert!(!blocks[0].busy && !blocks[1].busy);
    assert_eq!(blocks[0].size, 32);
}

#[test]
fn pointers_past_the_end_or_from_another_buffer_are_out_of_range() {
    let mut buf = AlignedBuf::<128>::new();
    let mut other = AlignedBuf::<128>::new();
    let mut arena = RandomAllocator::new(buf.as_mut_slice()).unwrap();
    let live = arena.raw_alloc(16, 8).unwrap();

    let end = arena.region().end();
    let past_end = NonNull::new((end + H) as *mut u8).unwrap();
    let foreign = NonNull::new(other.as_mut_slice()[H..].as_mut_ptr()).unwrap();

    for ptr in [past_end, foreign] {
        // SAFETY: both pointers are rejected before anything is read.
        let err = unsafe { arena.raw_free(ptr) }.unwrap_err();
        assert!(matches!(err, ArenaError::OutOfRange { .. }), "{err:?}");
    }

    // SAFETY: `live` is still allocated and freed once.
    unsafe { arena.raw_free(live).unwrap() };
    assert_eq!(arena.free_bytes(), 128 - H);
}

// ── Bump allocators ──────────────────────────────────────────────────

fn assert_monotonic_and_aligned<A: ArenaAllocator>(arena: &mut A) {
    let mut last = 0usize;
    for (bytes, align) in [(1, 1), (7, 2), (3, 8), (16, 16), (0, 4), (5, 32), (2, 1)] {
        let p = arena.raw_alloc(bytes, align).unwrap();
        let addr = p.as_ptr() as usize;
        assert_eq!(addr % align, 0, "alignment {align}");
        assert!(addr >= last);
        last = addr;
    }
}

#[test]
fn bump_allocators_hand_out_increasing_aligned_addresses() {
    let mut lin = AlignedBuf::<512>::new();
    let mut stk = AlignedBuf::<512>::new();
    assert_monotonic_and_aligned(&mut LinearAllocator::new(lin.as_mut_slice()));
    assert_monotonic_and_aligned(&mut StackAllocator::new(stk.as_mut_slice()));
}

#[test]
fn generic_init_builds_every_allocator() {
    fn build<'buf, A: ArenaInit<'buf>>(buffer: &'buf mut [u8]) -> A {
        A::init(buffer).unwrap()
    }

    let mut a = AlignedBuf::<128>::new();
    let mut b = AlignedBuf::<128>::new();
    let mut c = AlignedBuf::<128>::new();
    let mut linear: LinearAllocator = build(a.as_mut_slice());
    let mut stack: StackAllocator = build(b.as_mut_slice());
    let mut random: RandomAllocator = build(c.as_mut_slice());

    assert!(linear.raw_alloc(8, 8).is_ok());
    assert!(stack.raw_alloc(8, 8).is_ok());
    assert!(random.raw_alloc(8, 8).is_ok());
}

// ── DoubleBufferAllocator ────────────────────────────────────────────

#[test]
fn second_generation_exhausts_smaller_buffer() {
    let mut a = AlignedBuf::<128>::new();
    let mut b = AlignedBuf::<64>::new();
    let a_base = a.addr();
    let mut db =
        DoubleBufferAllocator::<LinearAllocator>::init(a.as_mut_slice(), b.as_mut_slice())
            .unwrap();

    let p = db.current_mut().raw_alloc(100, 1).unwrap();
    assert_eq!(p.as_ptr() as usize, a_base);

    db.swap();
    let err = db.current_mut().raw_alloc(100, 1).unwrap_err();
    assert!(matches!(err, ArenaError::CapacityExceeded { .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn double_buffered_free_lists_cycle_generations() {
    let mut a = AlignedBuf::<256>::new();
    let mut b = AlignedBuf::<256>::new();
    let mut db =
        DoubleBufferAllocator::<RandomAllocator>::init(a.as_mut_slice(), b.as_mut_slice())
            .unwrap();

    let mut previous: Option<NonNull<u64>> = None;
    for frame in 0..6u64 {
        let value = db.current_mut().alloc(frame * 10).unwrap();
        if let Some(prev) = previous {
            // SAFETY: `prev` was allocated one generation ago and lives in
            // the swapped allocator until the next swap.
            assert_eq!(unsafe { *prev.as_ptr() }, (frame - 1) * 10);
        }
        previous = Some(value);
        db.swap();
        assert_eq!(db.current().blocks().len(), 1);
    }
    assert_eq!(db.generation(), 6);
}

// ── Typed allocation ─────────────────────────────────────────────────

#[test]
fn typed_lifo_pairs_leave_side_effects_balanced() {
    let tracker = DropTracker::new();
    let mut buf = AlignedBuf::<1024>::new();
    let mut stack = StackAllocator::new(buf.as_mut_slice());

    for round in 0..3 {
        let mut ptrs = Vec::new();
        for id in 0..10 {
            ptrs.push(stack.alloc(tracker.track(round * 100 + id)).unwrap());
        }
        assert_eq!(tracker.live(), 10);
        while let Some(p) = ptrs.pop() {
            // SAFETY: strict LIFO order, each pointer freed once.
            unsafe { stack.free(p).unwrap() };
        }
        assert_eq!(tracker.live(), 0);
        assert_eq!(stack.used(), 0);
    }
    assert_eq!(tracker.created(), 30);
}

#[test]
fn boxes_release_blocks_in_both_freeing_allocators() {
    let tracker = DropTracker::new();
    let mut sbuf = AlignedBuf::<256>::new();
    let mut rbuf = AlignedBuf::<256>::new();
    let mut stack = StackAllocator::new(sbuf.as_mut_slice());
    let mut random = RandomAllocator::new(rbuf.as_mut_slice()).unwrap();

    for id in 0..5 {
        let s = stack.boxed(tracker.track(id)).unwrap();
        assert_eq!(s.id(), id);
        drop(s);
        let r = random.boxed(tracker.track(id)).unwrap();
        assert_eq!(r.id(), id);
    }
    assert_eq!(tracker.live(), 0);
    assert_eq!(stack.used(), 0);
    assert_eq!(random.free_bytes(), 256 - H);
}

#[test]
fn dump_reports_buffer_contents() {
    let mut buf = AlignedBuf::<32>::filled(0x5a);
    let mut stack = StackAllocator::new(buf.as_mut_slice());
    stack.raw_alloc(4, 1).unwrap();

    let mut out = String::new();
    stack.dump(&mut out).unwrap();
    let hex: String = out.lines().next().unwrap().split_whitespace().collect();
    // Padding tag of 1 at offset 0, then untouched filler.
    assert!(hex.starts_with("015a5a"));
    assert!(out.ends_with(" --- dumped 32 bytes --- \n"));
}
