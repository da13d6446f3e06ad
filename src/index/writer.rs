//! Single writer of a language index.
//!
//! A writer holds the directory's `write` lock from open to close. Added
//! documents are buffered until [`IndexWriter::commit`]; deletions apply to
//! committed and buffered documents alike and become durable on commit.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};

use crate::error::{Result, TaxisError};
use crate::index::document::{CategoryPath, IndexedDocument};
use crate::index::segment::{
    DeletionBitmap, MANIFEST_FILE, Manifest, SegmentInfo, deletions_file_name, read_segment,
    write_segment,
};
use crate::storage::{Storage, StorageLock};

pub const WRITE_LOCK: &str = "write";

/// How an existing index is treated when a writer opens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Start from an empty index; the first commit drops every existing segment.
    Create,
    /// Keep the committed segments, creating the index if it does not exist.
    CreateOrAppend,
}

#[derive(Debug, Clone, Default)]
pub struct WriterStats {
    pub docs_added: u64,
    pub docs_deleted: u64,
    pub commits: u64,
}

#[derive(Debug)]
struct WriterSegment {
    info: SegmentInfo,
    documents: Option<Vec<IndexedDocument>>,
    deletions: Option<DeletionBitmap>,
    dirty: bool,
}

impl WriterSegment {
    fn committed(info: SegmentInfo) -> Self {
        WriterSegment {
            info,
            documents: None,
            deletions: None,
            dirty: false,
        }
    }
}

#[derive(Debug)]
pub struct IndexWriter {
    storage: Arc<dyn Storage>,
    lock: Option<Box<dyn StorageLock>>,
    manifest: Manifest,
    segments: Vec<WriterSegment>,
    pending: Vec<IndexedDocument>,
    changed: bool,
    closed: bool,
    stats: WriterStats,
}

impl IndexWriter {
    /// Lock the index in `storage` and open it in `mode`.
    pub fn open(storage: Arc<dyn Storage>, mode: OpenMode) -> Result<Self> {
        let lock = storage.acquire_lock(WRITE_LOCK)?;
        let manifest = Manifest::load(storage.as_ref())?.unwrap_or_default();

        let segments = match mode {
            OpenMode::Create => Vec::new(),
            OpenMode::CreateOrAppend => manifest
                .segments
                .iter()
                .cloned()
                .map(WriterSegment::committed)
                .collect(),
        };
        debug!(
            "Opened index writer ({mode:?}) at generation {} with {} segments",
            manifest.generation,
            segments.len()
        );

        Ok(IndexWriter {
            storage,
            lock: Some(lock),
            changed: mode == OpenMode::Create,
            manifest,
            segments,
            pending: Vec::new(),
            closed: false,
            stats: WriterStats::default(),
        })
    }

    pub fn add_document(&mut self, document: IndexedDocument) -> Result<()> {
        self.check_closed()?;
        self.pending.push(document);
        self.changed = true;
        self.stats.docs_added += 1;
        Ok(())
    }

    /// Delete the document with `id`. Returns the number of documents removed.
    pub fn delete_by_id(&mut self, id: &str) -> Result<u64> {
        self.delete_where(|document| document.id == id)
    }

    pub fn delete_by_ids<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<u64> {
        let ids: HashSet<&str> = ids.iter().map(AsRef::as_ref).collect();
        self.delete_where(|document| ids.contains(document.id.as_str()))
    }

    /// Delete every document whose path starts with `prefix`.
    pub fn delete_by_path(&mut self, prefix: &CategoryPath) -> Result<u64> {
        if prefix.is_empty() {
            return Err(TaxisError::invalid_argument("empty category path"));
        }
        let ids = prefix.ids();
        self.delete_where(|document| document.path.starts_with_ids(&ids))
    }

    /// Delete every committed or buffered document matching `predicate`.
    pub fn delete_where<F>(&mut self, predicate: F) -> Result<u64>
    where
        F: Fn(&IndexedDocument) -> bool,
    {
        self.check_closed()?;
        let mut deleted = 0u64;

        for segment in &mut self.segments {
            if segment.documents.is_none() {
                segment.documents = Some(read_segment(self.storage.as_ref(), &segment.info)?);
            }
            if segment.deletions.is_none() {
                segment.deletions =
                    Some(DeletionBitmap::load(self.storage.as_ref(), &segment.info)?);
            }
            let (Some(documents), Some(deletions)) = (&segment.documents, &mut segment.deletions)
            else {
                continue;
            };

            for (doc, document) in documents.iter().enumerate() {
                if predicate(document) && deletions.delete(doc) {
                    deleted += 1;
                    segment.dirty = true;
                }
            }
        }

        let before = self.pending.len();
        self.pending.retain(|document| !predicate(document));
        deleted += (before - self.pending.len()) as u64;

        if deleted > 0 {
            self.changed = true;
            self.stats.docs_deleted += deleted;
        }
        Ok(deleted)
    }

    /// Make every change since the last commit durable.
    pub fn commit(&mut self) -> Result<()> {
        self.check_closed()?;
        if !self.changed {
            return Ok(());
        }

        let generation = self.manifest.generation + 1;
        let mut next_segment = self.manifest.next_segment;
        let mut infos = Vec::with_capacity(self.segments.len() + 1);

        for segment in &self.segments {
            let mut info = segment.info.clone();
            if segment.dirty
                && let Some(deletions) = &segment.deletions
            {
                if deletions.deleted_count() == info.doc_count {
                    continue;
                }
                let name = deletions_file_name(info.number, generation);
                deletions.write(self.storage.as_ref(), &name)?;
                info.deletions_generation = Some(generation);
                info.deleted_count = deletions.deleted_count();
            }
            infos.push(info);
        }

        let mut new_segment = None;
        if !self.pending.is_empty() {
            let number = next_segment;
            next_segment += 1;
            write_segment(self.storage.as_ref(), number, &self.pending)?;
            let info = SegmentInfo {
                number,
                doc_count: self.pending.len() as u64,
                deletions_generation: None,
                deleted_count: 0,
            };
            infos.push(info.clone());
            new_segment = Some(info);
        }

        let manifest = Manifest {
            generation,
            next_segment,
            committed_at: Utc::now(),
            segments: infos,
        };
        manifest.store(self.storage.as_ref())?;

        // Committed: bring the in-memory view in line with the manifest.
        let mut segments = Vec::with_capacity(manifest.segments.len());
        for mut segment in self.segments.drain(..) {
            if let Some(info) = manifest
                .segments
                .iter()
                .find(|info| info.number == segment.info.number)
            {
                segment.info = info.clone();
                segment.dirty = false;
                segments.push(segment);
            }
        }
        if let Some(info) = new_segment {
            let doc_count = info.doc_count as usize;
            segments.push(WriterSegment {
                info,
                documents: Some(std::mem::take(&mut self.pending)),
                deletions: Some(DeletionBitmap::new(doc_count)),
                dirty: false,
            });
        }
        self.segments = segments;

        info!(
            "Committed generation {generation}: {} segments, {} live documents",
            manifest.segments.len(),
            manifest.live_count()
        );
        self.manifest = manifest;
        self.changed = false;
        self.stats.commits += 1;
        self.remove_unreferenced_files();
        Ok(())
    }

    /// Commit outstanding changes and release the lock.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.commit()?;
        self.closed = true;
        if let Some(mut lock) = self.lock.take() {
            lock.release()?;
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pending_docs(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// Documents currently visible to this writer, including buffered ones.
    pub fn live_count(&self) -> u64 {
        let committed: u64 = self
            .segments
            .iter()
            .map(|segment| match &segment.deletions {
                Some(deletions) => segment.info.doc_count - deletions.deleted_count(),
                None => segment.info.live_count(),
            })
            .sum();
        committed + self.pending.len() as u64
    }

    fn check_closed(&self) -> Result<()> {
        if self.closed {
            Err(TaxisError::index("Writer is closed"))
        } else {
            Ok(())
        }
    }

    /// Delete segment files and stale bitmaps the manifest does not list.
    /// Failures only leave garbage behind.
    fn remove_unreferenced_files(&self) {
        let referenced: HashSet<String> = self.manifest.files().into_iter().collect();
        let files = match self.storage.list_files() {
            Ok(files) => files,
            Err(e) => {
                warn!("Could not list index files: {e}");
                return;
            }
        };
        for file in files {
            let is_index_file = file.starts_with("segment_") || file.ends_with(".tmp");
            if is_index_file && file != MANIFEST_FILE && !referenced.contains(&file) {
                if let Err(e) = self.storage.delete_file(&file) {
                    warn!("Could not delete unreferenced file {file}: {e}");
                }
            }
        }
    }
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if !self.closed && self.changed {
            warn!(
                "Index writer dropped with uncommitted changes ({} buffered documents)",
                self.pending.len()
            );
        }
    }
}
