use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::common::{
    FrameId, PageId, Result, StratumError, INVALID_PAGE_ID, PAGE_SIZE, PAGE_TABLE_BUCKET_SIZE,
};
use crate::container::ExtendibleHashTable;
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::{FrameHeader, LruKReplacer, ReadPageGuard, WritePageGuard};

/// State shared between the pool and its page guards, so a guard can
/// release its pin without borrowing the pool.
pub(crate) struct PoolState {
    frames: Vec<Arc<FrameHeader>>,
    /// Page directory: resident page id -> frame index
    page_table: ExtendibleHashTable<PageId, FrameId>,
    replacer: LruKReplacer,
    /// Free frames. Every pool operation holds this lock for its full
    /// duration, disk I/O included, which serializes the pool.
    latch: Mutex<VecDeque<FrameId>>,
}

impl PoolState {
    /// Releases one pin. Returns false when the page is not resident or
    /// its pin count is already zero. The dirty hint is OR-ed into the
    /// frame's dirty flag; at pin count zero the frame becomes evictable.
    pub(crate) fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let _free_list = self.latch.lock();

        let Some(frame_id) = self.page_table.find(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.as_usize()];

        match frame.unpin() {
            None => false,
            Some(remaining) => {
                if is_dirty {
                    frame.set_dirty(true);
                }
                if remaining == 0 {
                    self.replacer.set_evictable(frame_id, true);
                }
                true
            }
        }
    }
}

/// BufferPoolManager mediates all page access between the index layer and
/// the disk. It owns a fixed array of frames, an extendible hash table
/// mapping resident page ids to frames, and an LRU-K replacer that picks
/// eviction victims.
pub struct BufferPoolManager {
    pool_size: usize,
    state: Arc<PoolState>,
    disk_scheduler: DiskScheduler,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, replacer_k: usize, disk_manager: Arc<DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);
        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(FrameHeader::new(frame_id)));
            free_list.push_back(frame_id);
        }

        Self {
            pool_size,
            state: Arc::new(PoolState {
                frames,
                page_table: ExtendibleHashTable::new(PAGE_TABLE_BUCKET_SIZE),
                replacer: LruKReplacer::new(pool_size, replacer_k),
                latch: Mutex::new(free_list),
            }),
            disk_scheduler: DiskScheduler::new(disk_manager),
        }
    }

    /// Allocates a fresh page and returns it pinned behind a write guard.
    /// Fails with `PoolExhausted` when no frame is free and nothing is
    /// evictable.
    pub fn new_page(&self) -> Result<(PageId, WritePageGuard)> {
        let mut free_list = self.state.latch.lock();
        let frame_id = self.acquire_frame(&mut free_list)?;

        let page_id = match self.disk_scheduler.disk_manager().allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                free_list.push_back(frame_id);
                return Err(e);
            }
        };

        let frame = &self.state.frames[frame_id.as_usize()];
        frame.set_page_id(page_id);
        frame.pin();
        self.state.replacer.record_access(frame_id);
        self.state.replacer.set_evictable(frame_id, false);
        self.state.page_table.insert(page_id, frame_id);
        trace!(
            page_id = page_id.as_u32(),
            frame_id = frame_id.as_u32(),
            "allocated page"
        );

        Ok((
            page_id,
            WritePageGuard::new(Arc::clone(&self.state), Arc::clone(frame), page_id),
        ))
    }

    /// Pins the page in a frame, loading it from disk if absent, and
    /// returns the frame. The caller owns one pin and must release it with
    /// `unpin_page` (the page guards do this automatically).
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<FrameHeader>> {
        if page_id == INVALID_PAGE_ID {
            return Err(StratumError::InvalidPageId(page_id));
        }

        let mut free_list = self.state.latch.lock();

        if let Some(frame_id) = self.state.page_table.find(&page_id) {
            let frame = &self.state.frames[frame_id.as_usize()];
            frame.pin();
            self.state.replacer.record_access(frame_id);
            self.state.replacer.set_evictable(frame_id, false);
            return Ok(Arc::clone(frame));
        }

        let frame_id = self.acquire_frame(&mut free_list)?;
        let frame = &self.state.frames[frame_id.as_usize()];

        let mut data = [0u8; PAGE_SIZE];
        if let Err(e) = self.disk_scheduler.schedule_read_sync(page_id, &mut data) {
            free_list.push_back(frame_id);
            return Err(e);
        }

        frame.set_page_id(page_id);
        frame.copy_from(&data);
        frame.pin();
        self.state.replacer.record_access(frame_id);
        self.state.replacer.set_evictable(frame_id, false);
        self.state.page_table.insert(page_id, frame_id);

        Ok(Arc::clone(frame))
    }

    /// Releases one pin; see `PoolState::unpin_page`.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.state.unpin_page(page_id, is_dirty)
    }

    /// Writes the page out unconditionally and clears its dirty flag.
    /// Returns false when the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if page_id == INVALID_PAGE_ID {
            return Err(StratumError::InvalidPageId(page_id));
        }

        let _free_list = self.state.latch.lock();

        let Some(frame_id) = self.state.page_table.find(&page_id) else {
            return Ok(false);
        };
        let frame = &self.state.frames[frame_id.as_usize()];

        let mut data = [0u8; PAGE_SIZE];
        frame.copy_to(&mut data);
        self.disk_scheduler.schedule_write_sync(page_id, &data)?;
        frame.set_dirty(false);

        Ok(true)
    }

    /// Writes every resident page out unconditionally.
    pub fn flush_all_pages(&self) -> Result<()> {
        let _free_list = self.state.latch.lock();

        for frame in &self.state.frames {
            let page_id = frame.page_id();
            if page_id == INVALID_PAGE_ID {
                continue;
            }
            let mut data = [0u8; PAGE_SIZE];
            frame.copy_to(&mut data);
            self.disk_scheduler.schedule_write_sync(page_id, &data)?;
            frame.set_dirty(false);
        }
        debug!("flushed all resident pages");

        Ok(())
    }

    /// Drops the page from the pool and hands its id back to the disk
    /// manager. Succeeds trivially when the page is not resident; returns
    /// false when it is pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut free_list = self.state.latch.lock();

        let Some(frame_id) = self.state.page_table.find(&page_id) else {
            return Ok(true);
        };
        let frame = &self.state.frames[frame_id.as_usize()];

        if frame.pin_count() > 0 {
            return Ok(false);
        }

        if frame.is_dirty() {
            let mut data = [0u8; PAGE_SIZE];
            frame.copy_to(&mut data);
            self.disk_scheduler.schedule_write_sync(page_id, &data)?;
        }

        self.state.page_table.remove(&page_id);
        self.state.replacer.remove(frame_id);
        frame.reset();
        free_list.push_back(frame_id);
        self.disk_scheduler.disk_manager().deallocate_page(page_id)?;

        Ok(true)
    }

    /// Fetches the page behind an RAII read guard.
    pub fn read_page(&self, page_id: PageId) -> Result<ReadPageGuard> {
        let frame = self.fetch_page(page_id)?;
        Ok(ReadPageGuard::new(Arc::clone(&self.state), frame, page_id))
    }

    /// Fetches the page behind an RAII write guard.
    pub fn write_page(&self, page_id: PageId) -> Result<WritePageGuard> {
        let frame = self.fetch_page(page_id)?;
        Ok(WritePageGuard::new(Arc::clone(&self.state), frame, page_id))
    }

    /// Pin count of a resident page, or None when the page is not resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let _free_list = self.state.latch.lock();
        self.state
            .page_table
            .find(&page_id)
            .map(|frame_id| self.state.frames[frame_id.as_usize()].pin_count())
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.latch.lock().len()
    }

    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        self.disk_scheduler.disk_manager()
    }

    /// Picks a frame for a new resident: the free list first, then an
    /// eviction victim. A dirty victim is written back before the frame is
    /// recycled.
    fn acquire_frame(&self, free_list: &mut VecDeque<FrameId>) -> Result<FrameId> {
        if let Some(frame_id) = free_list.pop_front() {
            return Ok(frame_id);
        }

        let Some(frame_id) = self.state.replacer.evict() else {
            return Err(StratumError::PoolExhausted);
        };

        let frame = &self.state.frames[frame_id.as_usize()];
        let old_page_id = frame.page_id();
        if frame.is_dirty() {
            let mut data = [0u8; PAGE_SIZE];
            frame.copy_to(&mut data);
            debug!(page_id = old_page_id.as_u32(), "writing back dirty victim");
            self.disk_scheduler.schedule_write_sync(old_page_id, &data)?;
        }

        self.state.page_table.remove(&old_page_id);
        frame.reset();
        Ok(frame_id)
    }
}
