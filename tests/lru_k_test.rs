//! Integration tests for the LRU-K replacer

use stratum::buffer::LruKReplacer;
use stratum::common::FrameId;

#[test]
fn test_under_k_frames_drain_fifo() {
    let replacer = LruKReplacer::new(10, 2);

    for i in 0..5 {
        replacer.record_access(FrameId::new(i));
        replacer.set_evictable(FrameId::new(i), true);
    }
    assert_eq!(replacer.size(), 5);

    // Every frame has a single access, so eviction follows first-access order
    for i in 0..5 {
        assert_eq!(replacer.evict(), Some(FrameId::new(i)));
    }
    assert_eq!(replacer.size(), 0);
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_under_k_always_beats_full_history() {
    let replacer = LruKReplacer::new(10, 2);

    // Frame 0 and 1 reach two accesses; frame 2 stays at one
    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(1));
    replacer.record_access(FrameId::new(1));
    replacer.record_access(FrameId::new(2));

    for i in 0..3 {
        replacer.set_evictable(FrameId::new(i), true);
    }

    // The under-k frame goes first even though it was touched last
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    // Then the cached frames by least recent access
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
}

#[test]
fn test_cache_move_to_back_on_reaccess() {
    let replacer = LruKReplacer::new(10, 2);

    for i in 0..3 {
        replacer.record_access(FrameId::new(i));
        replacer.record_access(FrameId::new(i));
    }
    // Frames 0 and 1 get touched again and become the hottest
    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(1));

    for i in 0..3 {
        replacer.set_evictable(FrameId::new(i), true);
    }

    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
}

#[test]
fn test_pinned_frames_survive_eviction_pressure() {
    let replacer = LruKReplacer::new(10, 2);

    for i in 0..4 {
        replacer.record_access(FrameId::new(i));
        replacer.set_evictable(FrameId::new(i), true);
    }
    // Pin frames 0 and 2
    replacer.set_evictable(FrameId::new(0), false);
    replacer.set_evictable(FrameId::new(2), false);
    assert_eq!(replacer.size(), 2);

    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(3)));
    assert_eq!(replacer.evict(), None);

    // Releasing a pin makes the frame eligible again
    replacer.set_evictable(FrameId::new(0), true);
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
}

#[test]
fn test_evicted_frame_starts_fresh() {
    let replacer = LruKReplacer::new(10, 2);

    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(0));
    replacer.set_evictable(FrameId::new(0), true);
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));

    // The same frame id re-enters with an empty history
    replacer.record_access(FrameId::new(1));
    replacer.record_access(FrameId::new(0));
    replacer.set_evictable(FrameId::new(0), true);
    replacer.set_evictable(FrameId::new(1), true);

    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
}

#[test]
fn test_remove_then_size() {
    let replacer = LruKReplacer::new(10, 2);

    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(1));
    replacer.set_evictable(FrameId::new(0), true);
    replacer.set_evictable(FrameId::new(1), true);
    assert_eq!(replacer.size(), 2);

    replacer.remove(FrameId::new(0));
    assert_eq!(replacer.size(), 1);
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), None);
}
