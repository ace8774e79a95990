use thiserror::Error;

use super::types::PageId;

/// Storage engine error types
#[derive(Error, Debug)]
pub enum StratumError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("buffer pool is full, no evictable frames available")]
    PoolExhausted,

    #[error("page {0} not found")]
    PageNotFound(PageId),

    #[error("invalid page id: {0}")]
    InvalidPageId(PageId),

    #[error("page {0} is still pinned")]
    PageStillPinned(PageId),

    #[error("disk scheduler error: {0}")]
    DiskScheduler(String),

    #[error("header page has no room for another index record")]
    HeaderPageFull,

    #[error("index {0} not found")]
    IndexNotFound(String),
}

pub type Result<T> = std::result::Result<T, StratumError>;
