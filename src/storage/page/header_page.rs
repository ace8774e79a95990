use crate::common::{PageId, PAGE_SIZE};

use super::b_plus_tree_page::{get_u32, put_u32};

// Header page layout (always page 0): a record count followed by
// fixed-width records of (index name, root page id).
//
//  ----------------------------------------------------------
// | RecordCount (4) | Name (32) RootId (4) | Name (32) ... |
//  ----------------------------------------------------------
const NUM_RECORDS_OFFSET: usize = 0;
const RECORDS_OFFSET: usize = 4;
const MAX_NAME_LEN: usize = 32;
const RECORD_SIZE: usize = MAX_NAME_LEN + 4;

/// Largest number of index records the header page can hold.
pub const MAX_HEADER_RECORDS: usize = (PAGE_SIZE - RECORDS_OFFSET) / RECORD_SIZE;

/// Typed view of the header page, which maps every index name to the page
/// id of that index's root. A zeroed page is a valid empty header.
pub struct HeaderPage<B> {
    data: B,
}

impl<B: AsRef<[u8]>> HeaderPage<B> {
    pub fn new(data: B) -> Self {
        assert_eq!(data.as_ref().len(), PAGE_SIZE);
        Self { data }
    }

    pub fn num_records(&self) -> usize {
        get_u32(self.data.as_ref(), NUM_RECORDS_OFFSET) as usize
    }

    /// Root page id recorded for the named index.
    pub fn get_root_id(&self, index_name: &str) -> Option<PageId> {
        let index = self.find_record(index_name)?;
        let offset = Self::record_offset(index);
        Some(PageId::new(get_u32(
            self.data.as_ref(),
            offset + MAX_NAME_LEN,
        )))
    }

    fn find_record(&self, index_name: &str) -> Option<usize> {
        (0..self.num_records()).find(|&i| self.record_name(i) == index_name.as_bytes())
    }

    fn record_name(&self, index: usize) -> &[u8] {
        let offset = Self::record_offset(index);
        let name = &self.data.as_ref()[offset..offset + MAX_NAME_LEN];
        let end = name.iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LEN);
        &name[..end]
    }

    fn record_offset(index: usize) -> usize {
        RECORDS_OFFSET + index * RECORD_SIZE
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> HeaderPage<B> {
    pub fn init(&mut self) {
        self.data.as_mut().fill(0);
    }

    /// Registers a new index. Returns false when the name is already taken
    /// or the page is out of record slots.
    pub fn insert_record(&mut self, index_name: &str, root_page_id: PageId) -> bool {
        assert!(index_name.len() <= MAX_NAME_LEN, "index name too long");

        if self.find_record(index_name).is_some() {
            return false;
        }
        let count = self.num_records();
        if count >= MAX_HEADER_RECORDS {
            return false;
        }

        self.write_record(count, index_name, root_page_id);
        self.set_num_records(count + 1);
        true
    }

    /// Rewrites the root page id of an existing record.
    pub fn update_record(&mut self, index_name: &str, root_page_id: PageId) -> bool {
        let Some(index) = self.find_record(index_name) else {
            return false;
        };
        let offset = Self::record_offset(index) + MAX_NAME_LEN;
        put_u32(self.data.as_mut(), offset, root_page_id.as_u32());
        true
    }

    /// Drops a record, compacting the ones after it.
    pub fn delete_record(&mut self, index_name: &str) -> bool {
        let Some(index) = self.find_record(index_name) else {
            return false;
        };
        let count = self.num_records();
        let data = self.data.as_mut();

        let start = Self::record_offset(index);
        let end = Self::record_offset(count);
        data.copy_within(start + RECORD_SIZE..end, start);
        data[end - RECORD_SIZE..end].fill(0);

        self.set_num_records(count - 1);
        true
    }

    fn write_record(&mut self, index: usize, index_name: &str, root_page_id: PageId) {
        let offset = Self::record_offset(index);
        let data = self.data.as_mut();
        data[offset..offset + MAX_NAME_LEN].fill(0);
        data[offset..offset + index_name.len()].copy_from_slice(index_name.as_bytes());
        put_u32(data, offset + MAX_NAME_LEN, root_page_id.as_u32());
    }

    fn set_num_records(&mut self, count: usize) {
        put_u32(self.data.as_mut(), NUM_RECORDS_OFFSET, count as u32);
    }
}
