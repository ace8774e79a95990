use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;
use tracing::debug;

/// A bucket holding at most `bucket_size` key/value pairs. Buckets are
/// shared: several directory slots may address the same bucket index.
struct Bucket<K, V> {
    /// How many low-order hash bits decide membership in this bucket
    depth: usize,
    items: Vec<(K, V)>,
}

impl<K, V> Bucket<K, V> {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            items: Vec::new(),
        }
    }
}

struct HashTableState<K, V> {
    global_depth: usize,
    num_buckets: usize,
    /// Directory of length `2 ^ global_depth`; entries are indices into
    /// `buckets`, and entries differing only above a bucket's local depth
    /// alias the same index.
    dir: Vec<usize>,
    buckets: Vec<Bucket<K, V>>,
}

/// In-memory extendible hash table: a directory of shared buckets that
/// doubles when a full bucket's local depth has caught up with the global
/// depth. Serves as the buffer pool's page directory and works as a
/// standalone container.
pub struct ExtendibleHashTable<K, V> {
    bucket_size: usize,
    state: Mutex<HashTableState<K, V>>,
}

impl<K, V> ExtendibleHashTable<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a table with a single bucket at global depth 0.
    pub fn new(bucket_size: usize) -> Self {
        assert!(bucket_size > 0);
        Self {
            bucket_size,
            state: Mutex::new(HashTableState {
                global_depth: 0,
                num_buckets: 1,
                dir: vec![0],
                buckets: vec![Bucket::new(0)],
            }),
        }
    }

    fn hash_of(key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish() as usize
    }

    fn index_of(global_depth: usize, key: &K) -> usize {
        Self::hash_of(key) & ((1 << global_depth) - 1)
    }

    pub fn global_depth(&self) -> usize {
        self.state.lock().global_depth
    }

    pub fn local_depth(&self, dir_index: usize) -> usize {
        let state = self.state.lock();
        state.buckets[state.dir[dir_index]].depth
    }

    pub fn num_buckets(&self) -> usize {
        self.state.lock().num_buckets
    }

    pub fn dir_size(&self) -> usize {
        self.state.lock().dir.len()
    }

    /// Looks the key up in its bucket.
    pub fn find(&self, key: &K) -> Option<V> {
        let state = self.state.lock();
        let index = Self::index_of(state.global_depth, key);
        state.buckets[state.dir[index]]
            .items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Removes the key from its bucket. Returns false when absent.
    pub fn remove(&self, key: &K) -> bool {
        let mut state = self.state.lock();
        let index = Self::index_of(state.global_depth, key);
        let bucket_index = state.dir[index];
        let bucket = &mut state.buckets[bucket_index];
        match bucket.items.iter().position(|(k, _)| k == key) {
            Some(position) => {
                bucket.items.remove(position);
                true
            }
            None => false,
        }
    }

    /// Inserts the pair, overwriting an existing key in place. A full
    /// bucket is split (doubling the directory when its local depth equals
    /// the global depth) until the target has room.
    pub fn insert(&self, key: K, value: V) {
        let mut state = self.state.lock();

        let index = Self::index_of(state.global_depth, &key);
        let bucket_index = state.dir[index];
        if let Some(slot) = state.buckets[bucket_index]
            .items
            .iter_mut()
            .find(|(k, _)| *k == key)
        {
            slot.1 = value;
            return;
        }

        loop {
            let index = Self::index_of(state.global_depth, &key);
            let bucket_index = state.dir[index];

            if state.buckets[bucket_index].items.len() < self.bucket_size {
                state.buckets[bucket_index].items.push((key, value));
                return;
            }

            let local_depth = state.buckets[bucket_index].depth;
            if local_depth == state.global_depth {
                let mirror = state.dir.clone();
                state.dir.extend(mirror);
                state.global_depth += 1;
                debug!(global_depth = state.global_depth, "doubled hash directory");
            }
            state.num_buckets += 1;

            // Redistribute the full bucket over bit `local_depth`
            let local_mask = 1usize << local_depth;
            let old_items = std::mem::take(&mut state.buckets[bucket_index].items);
            let mut zero_bucket = Bucket::new(local_depth + 1);
            let mut one_bucket = Bucket::new(local_depth + 1);
            for (k, v) in old_items {
                if Self::hash_of(&k) & local_mask != 0 {
                    one_bucket.items.push((k, v));
                } else {
                    zero_bucket.items.push((k, v));
                }
            }

            let one_index = state.buckets.len();
            state.buckets[bucket_index] = zero_bucket;
            state.buckets.push(one_bucket);

            // Rewire every directory slot that aliased the old bucket
            for slot in 0..state.dir.len() {
                if state.dir[slot] == bucket_index && slot & local_mask != 0 {
                    state.dir[slot] = one_index;
                }
            }
        }
    }
}
