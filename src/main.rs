use std::sync::Arc;

use stratum::buffer::BufferPoolManager;
use stratum::index::{BPlusTree, U32Comparator};
use stratum::storage::disk::DiskManager;
use stratum::{PageId, RecordId, SlotId};

fn main() {
    println!("Stratum - a disk-oriented storage engine core");
    println!("=============================================\n");

    let db_path = "demo.db";

    let disk_manager = Arc::new(DiskManager::new(db_path).expect("failed to create disk manager"));
    println!("Opened database file: {}", db_path);

    let bpm = Arc::new(BufferPoolManager::new(10, 2, disk_manager));
    println!("Created buffer pool with 10 frames (LRU-2 replacement)\n");

    // Raw page round trip through the pool
    let (page_id, mut guard) = bpm.new_page().expect("failed to allocate page");
    println!("Allocated page {}", page_id);
    {
        let mut data = guard.data_mut();
        data[..5].copy_from_slice(b"hello");
    }
    drop(guard);
    bpm.flush_page(page_id).expect("failed to flush page");
    println!("Wrote and flushed page {}\n", page_id);

    // An index over the same pool
    let mut index = BPlusTree::new("demo_idx", Arc::clone(&bpm), U32Comparator, 4, 4);
    for key in [15u32, 3, 27, 9, 42, 21, 8, 33] {
        let value = RecordId::new(PageId::new(100 + key), SlotId::new(0));
        index.insert(key, value).expect("insert failed");
    }
    println!("Inserted 8 keys; root page is {}", index.root_page_id());

    match index.get_value(27).expect("lookup failed") {
        Some(record) => println!("Lookup 27 -> record on page {}", record.page_id),
        None => println!("Lookup 27 -> not found"),
    }

    print!("Keys in order:");
    for entry in index.iter().expect("iterator failed") {
        let (key, _) = entry.expect("iteration failed");
        print!(" {}", key);
    }
    println!();

    bpm.flush_all_pages().expect("failed to flush");

    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
}
