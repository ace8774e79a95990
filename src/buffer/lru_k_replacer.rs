use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;

use crate::common::FrameId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Queue {
    /// FIFO over first-access order, frames with fewer than k accesses
    History,
    /// LRU over last-access order, frames with at least k accesses
    Cache,
}

#[derive(Debug)]
struct FrameEntry {
    /// Total accesses observed for this frame
    count: usize,
    evictable: bool,
    queue: Queue,
    /// Key of this frame's node in whichever queue holds it; gives
    /// removal without a scan.
    pos: u64,
}

#[derive(Default)]
struct ReplacerState {
    entries: HashMap<FrameId, FrameEntry>,
    history: BTreeMap<u64, FrameId>,
    cache: BTreeMap<u64, FrameId>,
    next_pos: u64,
    /// Number of currently evictable tracked frames
    curr_size: usize,
}

/// LRU-K replacement policy.
///
/// Frames with fewer than k historical accesses are victimized before
/// frames with a full history: the former queue up FIFO by first access,
/// the latter LRU by last access. Eviction scans the history queue front
/// to back for an evictable frame and falls back to the cache queue.
pub struct LruKReplacer {
    k: usize,
    /// Largest frame id the replacer will track (the pool size)
    replacer_size: usize,
    state: Mutex<ReplacerState>,
}

impl LruKReplacer {
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(k > 0);
        Self {
            k,
            replacer_size: num_frames,
            state: Mutex::new(ReplacerState::default()),
        }
    }

    /// Picks the victim: the first evictable frame in the history queue,
    /// else the first evictable frame in the cache queue. The victim is
    /// untracked entirely.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let mut victim: Option<(u64, FrameId, Queue)> = None;
        for (&pos, &frame_id) in state.history.iter() {
            if state.entries[&frame_id].evictable {
                victim = Some((pos, frame_id, Queue::History));
                break;
            }
        }
        if victim.is_none() {
            for (&pos, &frame_id) in state.cache.iter() {
                if state.entries[&frame_id].evictable {
                    victim = Some((pos, frame_id, Queue::Cache));
                    break;
                }
            }
        }

        let (pos, frame_id, queue) = victim?;
        match queue {
            Queue::History => state.history.remove(&pos),
            Queue::Cache => state.cache.remove(&pos),
        };
        state.entries.remove(&frame_id);
        state.curr_size -= 1;
        Some(frame_id)
    }

    /// Records an access. The first access enqueues the frame at the back
    /// of the history queue (non-evictable until a caller says otherwise);
    /// the k-th access promotes it to the cache queue; later accesses move
    /// it to the cache queue's back.
    pub fn record_access(&self, frame_id: FrameId) {
        if frame_id.as_usize() >= self.replacer_size {
            return;
        }

        let mut state = self.state.lock();
        let state = &mut *state;
        let pos = state.next_pos;
        state.next_pos += 1;

        match state.entries.entry(frame_id) {
            Entry::Vacant(vacant) => {
                vacant.insert(FrameEntry {
                    count: 1,
                    evictable: false,
                    queue: Queue::History,
                    pos,
                });
                state.history.insert(pos, frame_id);
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.count += 1;
                let count = entry.count;
                let old_pos = entry.pos;
                if count >= self.k {
                    entry.queue = Queue::Cache;
                    entry.pos = pos;
                }
                if count == self.k {
                    state.history.remove(&old_pos);
                    state.cache.insert(pos, frame_id);
                } else if count > self.k {
                    state.cache.remove(&old_pos);
                    state.cache.insert(pos, frame_id);
                }
                // Under k the frame keeps its FIFO position
            }
        }
    }

    /// Flips the evictable flag; `curr_size` moves only on an actual
    /// transition. Unknown frames are ignored.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut state = self.state.lock();
        let state = &mut *state;

        if let Some(entry) = state.entries.get_mut(&frame_id) {
            if entry.evictable != evictable {
                entry.evictable = evictable;
                if evictable {
                    state.curr_size += 1;
                } else {
                    state.curr_size -= 1;
                }
            }
        }
    }

    /// Untracks a frame regardless of its access count. No-op for unknown
    /// frames; panics if the frame is tracked but not evictable, since
    /// that is a caller bug.
    pub fn remove(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        let state = &mut *state;

        let Some(entry) = state.entries.get(&frame_id) else {
            return;
        };
        if !entry.evictable {
            panic!("cannot remove non-evictable frame {frame_id}");
        }

        match entry.queue {
            Queue::History => state.history.remove(&entry.pos),
            Queue::Cache => state.cache.remove(&entry.pos),
        };
        state.entries.remove(&frame_id);
        state.curr_size -= 1;
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.state.lock().curr_size
    }
}
