use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, PAGE_SIZE};

use super::buffer_pool_manager::PoolState;
use super::FrameHeader;

/// RAII guard for read access to a pinned page. Dropping it unpins the
/// page with a clean hint.
pub struct ReadPageGuard {
    state: Arc<PoolState>,
    frame: Arc<FrameHeader>,
    page_id: PageId,
}

impl ReadPageGuard {
    pub(crate) fn new(state: Arc<PoolState>, frame: Arc<FrameHeader>, page_id: PageId) -> Self {
        Self {
            state,
            frame,
            page_id,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Locks the page bytes for reading.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.frame.read_data()
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        self.state.unpin_page(self.page_id, false);
    }
}

/// RAII guard for write access to a pinned page. The dirty hint is set by
/// the first mutable borrow of the bytes; dropping the guard unpins the
/// page with that hint.
pub struct WritePageGuard {
    state: Arc<PoolState>,
    frame: Arc<FrameHeader>,
    page_id: PageId,
    is_dirty: bool,
}

impl WritePageGuard {
    pub(crate) fn new(state: Arc<PoolState>, frame: Arc<FrameHeader>, page_id: PageId) -> Self {
        Self {
            state,
            frame,
            page_id,
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Locks the page bytes for reading.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.frame.read_data()
    }

    /// Locks the page bytes for writing and marks the page dirty.
    pub fn data_mut(&mut self) -> RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.is_dirty = true;
        self.frame.write_data()
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        self.state.unpin_page(self.page_id, self.is_dirty);
    }
}
