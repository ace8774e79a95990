use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::common::{PageId, Result, StratumError, PAGE_SIZE};

use super::DiskManager;

/// A disk I/O request handed to the background worker.
/// Buffers are owned by the request, so nothing outlives the caller's stack.
enum DiskRequest {
    Read {
        page_id: PageId,
        reply: Sender<Result<Box<[u8; PAGE_SIZE]>>>,
    },
    Write {
        page_id: PageId,
        data: Box<[u8; PAGE_SIZE]>,
        reply: Sender<Result<()>>,
    },
    Shutdown,
}

/// DiskScheduler funnels page I/O through a single background worker thread.
/// Requests travel over a bounded channel; callers block on a per-request
/// reply channel until the worker has completed the operation.
pub struct DiskScheduler {
    disk_manager: Arc<DiskManager>,
    request_tx: Sender<DiskRequest>,
    worker: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (request_tx, request_rx) = bounded::<DiskRequest>(64);

        let dm = Arc::clone(&disk_manager);
        let worker = thread::spawn(move || Self::run_worker(dm, request_rx));

        Self {
            disk_manager,
            request_tx,
            worker: Some(worker),
        }
    }

    fn run_worker(disk_manager: Arc<DiskManager>, request_rx: Receiver<DiskRequest>) {
        while let Ok(request) = request_rx.recv() {
            match request {
                DiskRequest::Read { page_id, reply } => {
                    let mut buf = Box::new([0u8; PAGE_SIZE]);
                    let result = disk_manager.read_page(page_id, &mut buf[..]).map(|_| buf);
                    let _ = reply.send(result);
                }
                DiskRequest::Write {
                    page_id,
                    data,
                    reply,
                } => {
                    let _ = reply.send(disk_manager.write_page(page_id, &data[..]));
                }
                DiskRequest::Shutdown => break,
            }
        }
    }

    /// Schedules a read request and waits for completion.
    pub fn schedule_read_sync(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let (reply_tx, reply_rx) = bounded(1);
        self.request_tx
            .send(DiskRequest::Read {
                page_id,
                reply: reply_tx,
            })
            .map_err(|e| StratumError::DiskScheduler(e.to_string()))?;

        let buf = reply_rx
            .recv()
            .map_err(|e| StratumError::DiskScheduler(e.to_string()))??;
        data.copy_from_slice(&buf[..]);
        Ok(())
    }

    /// Schedules a write request and waits for completion.
    pub fn schedule_write_sync(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let mut buf = Box::new([0u8; PAGE_SIZE]);
        buf.copy_from_slice(data);

        let (reply_tx, reply_rx) = bounded(1);
        self.request_tx
            .send(DiskRequest::Write {
                page_id,
                data: buf,
                reply: reply_tx,
            })
            .map_err(|e| StratumError::DiskScheduler(e.to_string()))?;

        reply_rx
            .recv()
            .map_err(|e| StratumError::DiskScheduler(e.to_string()))??;
        Ok(())
    }

    /// Returns a reference to the underlying DiskManager.
    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        let _ = self.request_tx.send(DiskRequest::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
