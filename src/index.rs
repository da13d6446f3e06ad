//! Per-language training corpora.
//!
//! Labeled documents are stored in segmented, checksummed index directories
//! (one per language) that are written by a single [`IndexWriter`] and read
//! through point-in-time [`IndexReader`] snapshots. [`IndexManager`] bundles
//! the add, remove, update and rebuild operations over a structure root.

pub mod document;
pub mod manager;
pub mod reader;
pub mod segment;
pub mod table;
pub mod writer;

pub use document::{CategoryLevel, CategoryPath, DocumentStatus, IndexedDocument, category_id};
pub use manager::IndexManager;
pub use reader::IndexReader;
pub use table::TrainingRow;
pub use writer::{IndexWriter, OpenMode};
