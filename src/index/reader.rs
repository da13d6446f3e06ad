//! Point-in-time view of a committed language index.
//!
//! Opening a reader copies every file of the current commit into a
//! [`MemoryStorage`] and decodes it, so later commits to the directory do not
//! affect classification until the reader is reopened.

use bit_vec::BitVec;
use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::error::{Result, TaxisError};
use crate::index::document::IndexedDocument;
use crate::index::segment::{DeletionBitmap, Manifest, read_segment};
use crate::storage::Storage;
use crate::storage::memory::MemoryStorage;

const SNAPSHOT_ATTEMPTS: usize = 3;

#[derive(Debug)]
pub struct IndexReader {
    manifest: Manifest,
    documents: Vec<IndexedDocument>,
    live: BitVec,
    num_docs: usize,
    snapshot_size: u64,
}

impl IndexReader {
    /// Open the last commit of `storage`, or `None` if nothing was committed.
    pub fn open(storage: &dyn Storage) -> Result<Option<Self>> {
        let mut last_error = None;
        for attempt in 1..=SNAPSHOT_ATTEMPTS {
            let Some(manifest) = Manifest::load(storage)? else {
                return Ok(None);
            };
            // A concurrent commit can remove files of the manifest just read.
            match MemoryStorage::snapshot(storage, manifest.files()) {
                Ok(snapshot) => return Self::decode(manifest, &snapshot).map(Some),
                Err(e) => {
                    debug!("Snapshot attempt {attempt} failed: {e}");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| TaxisError::index("Could not snapshot index")))
    }

    fn decode(manifest: Manifest, snapshot: &MemoryStorage) -> Result<Self> {
        let max_doc = manifest.doc_count() as usize;
        let mut documents = Vec::with_capacity(max_doc);
        let mut live = BitVec::with_capacity(max_doc);

        for info in &manifest.segments {
            let segment = read_segment(snapshot, info)?;
            let deletions = DeletionBitmap::load(snapshot, info)?;
            for (doc, document) in segment.into_iter().enumerate() {
                live.push(!deletions.is_deleted(doc));
                documents.push(document);
            }
        }

        let num_docs = live.iter().filter(|&is_live| is_live).count();
        if num_docs as u64 != manifest.live_count() {
            warn!(
                "Manifest lists {} live documents, segments hold {num_docs}",
                manifest.live_count()
            );
        }

        Ok(IndexReader {
            snapshot_size: snapshot.total_size(),
            manifest,
            documents,
            live,
            num_docs,
        })
    }

    /// Document slots, deleted ones included.
    pub fn max_doc(&self) -> usize {
        self.documents.len()
    }

    /// Live documents.
    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn is_live(&self, doc: usize) -> bool {
        self.live.get(doc).unwrap_or(false)
    }

    /// The document in slot `doc`, if the slot exists and is live.
    pub fn document(&self, doc: usize) -> Option<&IndexedDocument> {
        if self.is_live(doc) {
            self.documents.get(doc)
        } else {
            None
        }
    }

    /// Live documents in index order.
    pub fn live_documents(&self) -> impl Iterator<Item = &IndexedDocument> {
        self.documents
            .iter()
            .zip(self.live.iter())
            .filter_map(|(document, is_live)| is_live.then_some(document))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&IndexedDocument> {
        self.live_documents().find(|document| document.id == id)
    }

    /// Copies of every live document.
    pub fn documents(&self) -> Vec<IndexedDocument> {
        self.live_documents().cloned().collect()
    }

    pub fn generation(&self) -> u64 {
        self.manifest.generation
    }

    pub fn committed_at(&self) -> DateTime<Utc> {
        self.manifest.committed_at
    }

    /// Bytes copied into the snapshot.
    pub fn snapshot_size(&self) -> u64 {
        self.snapshot_size
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::index::document::CategoryPath;
    use crate::index::writer::{IndexWriter, OpenMode};

    #[test]
    fn test_empty_storage_has_no_reader() {
        let storage = MemoryStorage::new();
        assert!(IndexReader::open(&storage).unwrap().is_none());
    }

    #[test]
    fn test_reader_sees_last_commit_only() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let first = IndexedDocument::new("alpha", CategoryPath::from_names(["A"], None));
        let second = IndexedDocument::new("beta", CategoryPath::from_names(["B"], None));

        let mut writer = IndexWriter::open(storage.clone(), OpenMode::CreateOrAppend).unwrap();
        writer.add_document(first.clone()).unwrap();
        writer.add_document(second.clone()).unwrap();
        writer.commit().unwrap();

        let reader = IndexReader::open(storage.as_ref()).unwrap().unwrap();
        assert_eq!(reader.num_docs(), 2);
        assert_eq!(reader.generation(), 1);

        writer.delete_by_id(&first.id).unwrap();
        writer.close().unwrap();

        // The snapshot is unaffected by the later commit.
        assert_eq!(reader.num_docs(), 2);
        assert_eq!(reader.find_by_id(&first.id), Some(&first));

        let reopened = IndexReader::open(storage.as_ref()).unwrap().unwrap();
        assert_eq!(reopened.max_doc(), 2);
        assert_eq!(reopened.num_docs(), 1);
        assert!(!reopened.is_live(0));
        assert!(reopened.document(0).is_none());
        assert_eq!(reopened.document(1), Some(&second));
        assert_eq!(reopened.documents(), vec![second]);
        assert!(reopened.snapshot_size() > 0);
    }
}
