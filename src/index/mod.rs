mod b_plus_tree;
mod index_iterator;
mod key_comparator;

pub use b_plus_tree::BPlusTree;
pub use index_iterator::IndexIterator;
pub use key_comparator::{KeyComparator, U32Comparator};
