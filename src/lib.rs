//! Stratum - the storage-engine core of a disk-oriented RDBMS
//!
//! The crate provides a fixed-size buffer pool that mediates all access
//! between higher layers and a paginated database file, together with the
//! data structures that live on top of it.
//!
//! # Architecture
//!
//! - **Storage Layer** (`storage`): disk I/O and on-page formats
//!   - `DiskManager`: block-granular page reads/writes and id allocation
//!   - `DiskScheduler`: background worker funneling page I/O
//!   - `HeaderPage`: page 0, mapping index names to root page ids
//!   - `LeafPage`/`InternalPage`: typed views of B+ tree node pages
//!
//! - **Buffer Pool** (`buffer`): memory management for database pages
//!   - `BufferPoolManager`: pins pages into frames, evicting as needed
//!   - `LruKReplacer`: LRU-K replacement policy over two ordered queues
//!   - `FrameHeader`: per-frame metadata and the page bytes
//!   - `ReadPageGuard`/`WritePageGuard`: RAII pins with dirty tracking
//!
//! - **Container** (`container`): `ExtendibleHashTable`, the directory-based
//!   hash map used as the buffer pool's page directory
//!
//! - **Index** (`index`): `BPlusTree`, a page-resident ordered index with a
//!   linked leaf chain
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stratum::buffer::BufferPoolManager;
//! use stratum::index::{BPlusTree, U32Comparator};
//! use stratum::storage::disk::DiskManager;
//! use stratum::{PageId, RecordId, SlotId};
//!
//! let disk_manager = Arc::new(DiskManager::new("test.db").unwrap());
//! let bpm = Arc::new(BufferPoolManager::new(64, 2, disk_manager));
//!
//! let mut index = BPlusTree::new("orders_pk", Arc::clone(&bpm), U32Comparator, 32, 32);
//! index
//!     .insert(42, RecordId::new(PageId::new(7), SlotId::new(0)))
//!     .unwrap();
//! assert!(index.get_value(42).unwrap().is_some());
//! ```

pub mod buffer;
pub mod common;
pub mod container;
pub mod index;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{PageId, RecordId, Result, SlotId, StratumError};
