use std::sync::Arc;

use crate::buffer::BufferPoolManager;
use crate::common::{PageId, RecordId, Result, INVALID_PAGE_ID};
use crate::storage::page::LeafPage;

/// Iterator over the leaf chain, yielding entries in key order. Each leaf
/// is pinned only while its entries are being read.
pub struct IndexIterator {
    bpm: Arc<BufferPoolManager>,
    page_id: PageId,
    index: usize,
}

impl IndexIterator {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, page_id: PageId, index: usize) -> Self {
        Self {
            bpm,
            page_id,
            index,
        }
    }

    fn advance(&mut self) -> Result<Option<(u32, RecordId)>> {
        while self.page_id != INVALID_PAGE_ID {
            let next_page_id = {
                let guard = self.bpm.read_page(self.page_id)?;
                let data = guard.data();
                let leaf = LeafPage::new(&data[..]);

                if self.index < leaf.size() {
                    let item = (leaf.key_at(self.index), leaf.value_at(self.index));
                    self.index += 1;
                    return Ok(Some(item));
                }
                leaf.next_page_id()
            };

            self.page_id = next_page_id;
            self.index = 0;
        }
        Ok(None)
    }
}

impl Iterator for IndexIterator {
    type Item = Result<(u32, RecordId)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
