use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::buffer::{BufferPoolManager, WritePageGuard};
use crate::common::{PageId, RecordId, Result, HEADER_PAGE_ID, INVALID_PAGE_ID};
use crate::storage::page::{BPlusTreePage, HeaderPage, InternalPage, LeafPage};

use super::index_iterator::IndexIterator;
use super::key_comparator::KeyComparator;

/// B+ tree index whose nodes are buffer pool pages. The root page id is
/// persisted as a record on the header page under the index name.
///
/// Mutations take `&mut self`; the tree relies on the buffer pool's
/// serialization alone and is not safe for concurrent writers.
pub struct BPlusTree<C: KeyComparator> {
    index_name: String,
    root_page_id: PageId,
    bpm: Arc<BufferPoolManager>,
    comparator: C,
    leaf_max_size: usize,
    internal_max_size: usize,
}

impl<C: KeyComparator> BPlusTree<C> {
    pub fn new(
        index_name: impl Into<String>,
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            root_page_id: INVALID_PAGE_ID,
            bpm,
            comparator,
            leaf_max_size,
            internal_max_size,
        }
    }

    /// Rebinds to an index whose root was previously recorded on the
    /// header page. An unknown name yields an empty tree.
    pub fn open(
        index_name: impl Into<String>,
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Result<Self> {
        let index_name = index_name.into();
        let root_page_id = {
            let guard = bpm.read_page(HEADER_PAGE_ID)?;
            let data = guard.data();
            HeaderPage::new(&data[..])
                .get_root_id(&index_name)
                .unwrap_or(INVALID_PAGE_ID)
        };

        Ok(Self {
            index_name,
            root_page_id,
            bpm,
            comparator,
            leaf_max_size,
            internal_max_size,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.root_page_id == INVALID_PAGE_ID
    }

    pub fn root_page_id(&self) -> PageId {
        self.root_page_id
    }

    /// Point lookup.
    pub fn get_value(&self, key: u32) -> Result<Option<RecordId>> {
        if self.is_empty() {
            return Ok(None);
        }

        let leaf_page_id = self.find_leaf(key)?;
        let guard = self.bpm.read_page(leaf_page_id)?;
        let data = guard.data();
        Ok(LeafPage::new(&data[..]).lookup(key, &self.comparator))
    }

    /// Inserts the pair. Duplicate keys are rejected and leave the tree
    /// unchanged.
    pub fn insert(&mut self, key: u32, value: RecordId) -> Result<bool> {
        if self.is_empty() {
            self.start_new_tree(key, value)?;
            return Ok(true);
        }
        self.insert_into_leaf(key, value)
    }

    /// Iterates every entry in key order along the leaf chain.
    pub fn iter(&self) -> Result<IndexIterator> {
        if self.is_empty() {
            return Ok(IndexIterator::new(
                Arc::clone(&self.bpm),
                INVALID_PAGE_ID,
                0,
            ));
        }
        let leftmost = self.find_leftmost_leaf()?;
        Ok(IndexIterator::new(Arc::clone(&self.bpm), leftmost, 0))
    }

    /// Iterates in key order starting at the first key >= the given one.
    pub fn iter_from(&self, key: u32) -> Result<IndexIterator> {
        if self.is_empty() {
            return Ok(IndexIterator::new(
                Arc::clone(&self.bpm),
                INVALID_PAGE_ID,
                0,
            ));
        }

        let leaf_page_id = self.find_leaf(key)?;
        let index = {
            let guard = self.bpm.read_page(leaf_page_id)?;
            let data = guard.data();
            let leaf = LeafPage::new(&data[..]);
            if leaf.size() == 0 {
                0
            } else {
                let found = leaf.key_index(key, &self.comparator);
                match self.comparator.compare(leaf.key_at(found), key) {
                    Ordering::Less => found + 1,
                    Ordering::Equal => found,
                    Ordering::Greater => 0,
                }
            }
        };

        Ok(IndexIterator::new(Arc::clone(&self.bpm), leaf_page_id, index))
    }

    /// Descends from the root to the leaf covering the key, releasing each
    /// node before the next level is fetched.
    fn find_leaf(&self, key: u32) -> Result<PageId> {
        debug_assert!(!self.is_empty());
        let mut page_id = self.root_page_id;
        loop {
            let next = {
                let guard = self.bpm.read_page(page_id)?;
                let data = guard.data();
                let node = BPlusTreePage::new(&data[..]);
                if node.is_leaf() {
                    return Ok(page_id);
                }
                InternalPage::new(&data[..]).lookup(key, &self.comparator)
            };
            page_id = next;
        }
    }

    fn find_leftmost_leaf(&self) -> Result<PageId> {
        debug_assert!(!self.is_empty());
        let mut page_id = self.root_page_id;
        loop {
            let next = {
                let guard = self.bpm.read_page(page_id)?;
                let data = guard.data();
                let node = BPlusTreePage::new(&data[..]);
                if node.is_leaf() {
                    return Ok(page_id);
                }
                InternalPage::new(&data[..]).value_at(0)
            };
            page_id = next;
        }
    }

    /// First insert into an empty tree: a fresh page becomes the root leaf
    /// and the index is registered on the header page.
    fn start_new_tree(&mut self, key: u32, value: RecordId) -> Result<()> {
        let (page_id, mut guard) = self.bpm.new_page()?;
        {
            let mut data = guard.data_mut();
            let mut root = LeafPage::new(&mut data[..]);
            root.init(page_id, INVALID_PAGE_ID, self.leaf_max_size);
            root.insert(key, value, &self.comparator);
        }
        drop(guard);

        self.root_page_id = page_id;
        self.update_root_page_id(true)
    }

    fn insert_into_leaf(&mut self, key: u32, value: RecordId) -> Result<bool> {
        let leaf_page_id = self.find_leaf(key)?;
        let mut guard = self.bpm.write_page(leaf_page_id)?;

        // Duplicate check against a read view keeps the page clean when
        // the insert is rejected.
        {
            let data = guard.data();
            if LeafPage::new(&data[..])
                .lookup(key, &self.comparator)
                .is_some()
            {
                return Ok(false);
            }
        }

        let new_size = {
            let mut data = guard.data_mut();
            LeafPage::new(&mut data[..]).insert(key, value, &self.comparator)
        };

        if new_size >= self.leaf_max_size {
            self.split_leaf(&mut guard)?;
        }
        Ok(true)
    }

    /// Splits a full leaf: the upper half moves to a fresh right sibling,
    /// the chain is relinked, and the sibling's first key goes up to the
    /// parent.
    fn split_leaf(&mut self, old_guard: &mut WritePageGuard) -> Result<()> {
        let (new_page_id, mut new_guard) = self.bpm.new_page()?;

        let separator = {
            let mut old_data = old_guard.data_mut();
            let mut old_leaf = LeafPage::new(&mut old_data[..]);
            let parent_page_id = old_leaf.parent_page_id();
            let old_next = old_leaf.next_page_id();
            let moved = old_leaf.take_upper_half();
            old_leaf.set_next_page_id(new_page_id);

            let mut new_data = new_guard.data_mut();
            let mut new_leaf = LeafPage::new(&mut new_data[..]);
            new_leaf.init(new_page_id, parent_page_id, self.leaf_max_size);
            new_leaf.extend_from(&moved);
            new_leaf.set_next_page_id(old_next);
            new_leaf.key_at(0)
        };
        debug!(
            old = old_guard.page_id().as_u32(),
            new = new_page_id.as_u32(),
            "split leaf"
        );

        self.insert_into_parent(old_guard, separator, &mut new_guard)
    }

    /// Splits a full internal node and adopts the moved children.
    fn split_internal(&mut self, old_guard: &mut WritePageGuard) -> Result<()> {
        let (new_page_id, mut new_guard) = self.bpm.new_page()?;

        let (separator, moved) = {
            let mut old_data = old_guard.data_mut();
            let mut old_node = InternalPage::new(&mut old_data[..]);
            let parent_page_id = old_node.parent_page_id();
            let moved = old_node.take_upper_half();

            let mut new_data = new_guard.data_mut();
            let mut new_node = InternalPage::new(&mut new_data[..]);
            new_node.init(new_page_id, parent_page_id, self.internal_max_size);
            new_node.extend_from(&moved);
            (new_node.key_at(0), moved)
        };

        for &(_, child_page_id) in &moved {
            let mut child_guard = self.bpm.write_page(child_page_id)?;
            let mut data = child_guard.data_mut();
            BPlusTreePage::new(&mut data[..]).set_parent_page_id(new_page_id);
        }
        debug!(
            old = old_guard.page_id().as_u32(),
            new = new_page_id.as_u32(),
            "split internal node"
        );

        self.insert_into_parent(old_guard, separator, &mut new_guard)
    }

    /// Hooks a freshly split-off node into the tree. When the old node was
    /// the root, the tree grows a level; otherwise the separator goes into
    /// the parent, splitting it in turn when full.
    fn insert_into_parent(
        &mut self,
        old_guard: &mut WritePageGuard,
        separator: u32,
        new_guard: &mut WritePageGuard,
    ) -> Result<()> {
        let (old_page_id, parent_page_id) = {
            let data = old_guard.data();
            let node = BPlusTreePage::new(&data[..]);
            (node.page_id(), node.parent_page_id())
        };
        let new_page_id = new_guard.page_id();

        if parent_page_id == INVALID_PAGE_ID {
            let (root_page_id, mut root_guard) = self.bpm.new_page()?;
            {
                let mut data = root_guard.data_mut();
                let mut root = InternalPage::new(&mut data[..]);
                root.init(root_page_id, INVALID_PAGE_ID, self.internal_max_size);
                root.populate_new_root(old_page_id, separator, new_page_id);
            }
            {
                let mut data = old_guard.data_mut();
                BPlusTreePage::new(&mut data[..]).set_parent_page_id(root_page_id);
            }
            {
                let mut data = new_guard.data_mut();
                BPlusTreePage::new(&mut data[..]).set_parent_page_id(root_page_id);
            }

            self.root_page_id = root_page_id;
            debug!(root = root_page_id.as_u32(), "tree grew a level");
            return self.update_root_page_id(false);
        }

        let mut parent_guard = self.bpm.write_page(parent_page_id)?;
        let new_size = {
            let mut data = parent_guard.data_mut();
            let mut parent = InternalPage::new(&mut data[..]);
            parent.insert_after_child(old_page_id, separator, new_page_id);
            parent.size()
        };

        if new_size >= self.internal_max_size {
            self.split_internal(&mut parent_guard)?;
        }
        Ok(())
    }

    /// Keeps the header page record of the root in step with the tree.
    /// Insert mode registers the index; update mode rewrites the root id.
    fn update_root_page_id(&mut self, insert_record: bool) -> Result<()> {
        let mut guard = self.bpm.write_page(HEADER_PAGE_ID)?;
        let mut data = guard.data_mut();
        let mut header = HeaderPage::new(&mut data[..]);
        if insert_record {
            if !header.insert_record(&self.index_name, self.root_page_id) {
                header.update_record(&self.index_name, self.root_page_id);
            }
        } else {
            header.update_record(&self.index_name, self.root_page_id);
        }
        Ok(())
    }
}
