//! Operations over the language indexes of a structure root.
//!
//! A structure root holds one index directory per language, the custom stop
//! word files under `stopwords/` and the tree definition `structure.xml`:
//!
//! ```text
//! <root>/structure.xml
//! <root>/stopwords/stop_<language>.txt
//! <root>/<language>/manifest.json, segment_*.seg, segment_*_*.del
//! ```
//!
//! Every mutating operation opens its own writer, commits and closes it.
//! Failures are logged here and returned to the caller.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info};

use crate::analysis::registry::{self, AnalyzerRegistry};
use crate::config::EngineConfig;
use crate::error::{Result, TaxisError};
use crate::index::document::{CategoryPath, IndexedDocument};
use crate::index::reader::IndexReader;
use crate::index::segment::MANIFEST_FILE;
use crate::index::table::TrainingRow;
use crate::index::writer::{IndexWriter, OpenMode, WRITE_LOCK};
use crate::intern::InternPool;
use crate::storage::file::FileStorage;
use crate::storage::{Storage, StorageConfig};

pub const STRUCTURE_FILE: &str = "structure.xml";
pub const STOP_WORD_DIR: &str = "stopwords";

#[derive(Debug, Clone)]
pub struct IndexManager {
    root: PathBuf,
    languages: Vec<String>,
    commit_interval: usize,
    analyzers: Arc<AnalyzerRegistry>,
    pool: Arc<InternPool>,
    storage_config: StorageConfig,
}

impl IndexManager {
    pub fn new<P: Into<PathBuf>>(
        root: P,
        config: &EngineConfig,
        analyzers: Arc<AnalyzerRegistry>,
        pool: Arc<InternPool>,
    ) -> Self {
        IndexManager {
            root: root.into(),
            languages: config.languages.clone(),
            commit_interval: config.commit_interval.max(1),
            analyzers,
            pool,
            storage_config: StorageConfig::default(),
        }
    }

    /// Manager with its own analyzer registry and intern pool.
    pub fn standalone<P: Into<PathBuf>>(root: P, config: &EngineConfig) -> Self {
        let root = root.into();
        let analyzers = AnalyzerRegistry::new(root.join(STOP_WORD_DIR))
            .with_token_pattern(config.token_pattern.clone());
        Self::new(root, config, Arc::new(analyzers), Arc::new(InternPool::new()))
    }

    pub fn with_storage_config(mut self, storage_config: StorageConfig) -> Self {
        self.storage_config = storage_config;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn analyzers(&self) -> &Arc<AnalyzerRegistry> {
        &self.analyzers
    }

    pub fn index_dir(&self, language: &str) -> PathBuf {
        self.root.join(language)
    }

    pub fn structure_path(&self) -> PathBuf {
        self.root.join(STRUCTURE_FILE)
    }

    pub fn stop_word_path(&self, language: &str) -> PathBuf {
        self.analyzers.stop_word_path(language)
    }

    /// Whether `language` has a committed index.
    pub fn has_index(&self, language: &str) -> bool {
        self.index_dir(language).join(MANIFEST_FILE).is_file()
    }

    pub fn open_writer(&self, language: &str, mode: OpenMode) -> Result<IndexWriter> {
        let storage = FileStorage::new(self.index_dir(language), self.storage_config.clone())?;
        IndexWriter::open(Arc::new(storage), mode)
    }

    /// Remove the write lock a crashed writer left on `language`. Only safe
    /// while no other writer is open on that index.
    pub fn break_write_lock(&self, language: &str) -> Result<bool> {
        let dir = self.index_dir(language);
        if !dir.is_dir() {
            return Ok(false);
        }
        FileStorage::new(dir, self.storage_config.clone())?
            .break_lock(WRITE_LOCK)
            .inspect_err(|e| error!("Unlocking {language} index failed: {e}"))
    }

    /// Snapshot reader of `language`, or `None` when nothing was committed.
    pub fn open_reader(&self, language: &str) -> Result<Option<IndexReader>> {
        let dir = self.index_dir(language);
        if !dir.is_dir() {
            return Ok(None);
        }
        let storage = FileStorage::new(dir, self.storage_config.clone())?;
        IndexReader::open(&storage as &dyn Storage)
    }

    /// Index `replication_factor` copies of an example. Values below 1 count
    /// as 1. With `tokenize` the stored body is the analyzed text.
    pub fn add_document<S: AsRef<str>>(
        &self,
        language: &str,
        text: &str,
        names: &[S],
        replication_factor: i32,
        tokenize: bool,
    ) -> Result<usize> {
        self.try_add_document(language, text, names, replication_factor, tokenize)
            .inspect_err(|e| error!("Adding document to {language} index failed: {e}"))
    }

    fn try_add_document<S: AsRef<str>>(
        &self,
        language: &str,
        text: &str,
        names: &[S],
        replication_factor: i32,
        tokenize: bool,
    ) -> Result<usize> {
        let path = CategoryPath::from_names(names, Some(&self.pool));
        if path.is_empty() {
            return Err(TaxisError::invalid_argument("document has no category"));
        }
        let body = if tokenize {
            self.analyzers.get(language)?.tokenize_to_string(text)?
        } else {
            text.to_string()
        };

        let copies = replication_factor.max(1) as usize;
        let mut writer = self.open_writer(language, OpenMode::CreateOrAppend)?;
        for _ in 0..copies {
            writer.add_document(IndexedDocument::new(body.clone(), path.clone()))?;
        }
        writer.close()?;
        debug!("Added {copies} copies of a {path} example to {language}");
        Ok(copies)
    }

    /// Build (or extend) the index of `language` from training rows.
    ///
    /// The words of `stop_words_file` are merged into the stored stop word
    /// list first. With `index_category_names` every row also adds one
    /// document per populated level whose body is that level's name.
    pub fn build_from_table(
        &self,
        rows: &[TrainingRow],
        stop_words_file: Option<&Path>,
        language: &str,
        index_category_names: bool,
    ) -> Result<usize> {
        self.try_build_from_table(rows, stop_words_file, language, index_category_names)
            .inspect_err(|e| error!("Building {language} index failed: {e}"))
    }

    fn try_build_from_table(
        &self,
        rows: &[TrainingRow],
        stop_words_file: Option<&Path>,
        language: &str,
        index_category_names: bool,
    ) -> Result<usize> {
        self.merge_stop_words(language, stop_words_file)?;
        let analyzer = self.analyzers.get(language)?;

        let mut writer = self.open_writer(language, OpenMode::CreateOrAppend)?;
        let mut written = 0;
        for (count, row) in rows.iter().enumerate() {
            if row.is_indexable() {
                let path = CategoryPath::from_names(&row.names, Some(&self.pool));
                let body = analyzer.tokenize_to_string(&row.text)?;
                writer.add_document(IndexedDocument::new(body, path.clone()))?;
                written += 1;

                if index_category_names {
                    for (depth, level) in path.iter().enumerate() {
                        let synthetic =
                            IndexedDocument::new(level.name.to_string(), path.prefix(depth + 1));
                        writer.add_document(synthetic)?;
                        written += 1;
                    }
                }
            }
            if (count + 1) % self.commit_interval == 0 {
                debug!("Commit after {} rows", count + 1);
                writer.commit()?;
            }
        }
        writer.close()?;
        info!(
            "Indexed {written} documents from {} rows into {language}",
            rows.len()
        );
        Ok(written)
    }

    fn merge_stop_words(&self, language: &str, stop_words_file: Option<&Path>) -> Result<()> {
        let stored = self.stop_word_path(language);
        let mut words = BTreeSet::new();
        if stored.is_file() {
            words.extend(registry::read_stop_words(&stored)?);
        }
        if let Some(file) = stop_words_file {
            words.extend(registry::read_stop_words(file)?);
        }
        if !words.is_empty() {
            let words: Vec<String> = words.into_iter().collect();
            self.analyzers.store_stop_words(language, &words)?;
        }
        Ok(())
    }

    /// Delete, in every language, the documents whose path starts with
    /// `names`.
    pub fn remove_by_path<S: AsRef<str>>(&self, names: &[S]) -> Result<u64> {
        let prefix = CategoryPath::from_names(names, Some(&self.pool));
        let mut removed = 0;
        for language in &self.languages {
            if !self.has_index(language) {
                continue;
            }
            let count = self
                .open_writer(language, OpenMode::CreateOrAppend)
                .and_then(|mut writer| {
                    let count = writer.delete_by_path(&prefix)?;
                    writer.close()?;
                    Ok(count)
                })
                .inspect_err(|e| error!("Removing {prefix} from {language} failed: {e}"))?;
            info!("Removed {count} {prefix} documents from {language}");
            removed += count;
        }
        Ok(removed)
    }

    pub fn remove_by_ids<S: AsRef<str>>(&self, language: &str, ids: &[S]) -> Result<u64> {
        self.open_writer(language, OpenMode::CreateOrAppend)
            .and_then(|mut writer| {
                let count = writer.delete_by_ids(ids)?;
                writer.close()?;
                Ok(count)
            })
            .inspect_err(|e| error!("Removing documents from {language} failed: {e}"))
    }

    pub fn remove_by_id(&self, language: &str, id: &str) -> Result<u64> {
        self.remove_by_ids(language, &[id])
    }

    /// Replace the body of document `id`, keeping its id and path. Returns
    /// `false` if no live document has that id.
    pub fn update_document_body(&self, language: &str, id: &str, body: &str) -> Result<bool> {
        self.try_update_document_body(language, id, body)
            .inspect_err(|e| error!("Updating document {id} in {language} failed: {e}"))
    }

    fn try_update_document_body(&self, language: &str, id: &str, body: &str) -> Result<bool> {
        let Some(mut document) = self
            .open_reader(language)?
            .and_then(|reader| reader.find_by_id(id).cloned())
        else {
            return Ok(false);
        };
        document.body = body.to_string();

        let mut writer = self.open_writer(language, OpenMode::CreateOrAppend)?;
        writer.delete_by_id(id)?;
        writer.add_document(document)?;
        writer.close()?;
        Ok(true)
    }

    /// Rewrite the index of `language` from scratch with `documents`, each
    /// under a fresh id.
    pub fn rebuild_with_fresh_ids(
        &self,
        language: &str,
        documents: Vec<IndexedDocument>,
    ) -> Result<usize> {
        self.try_rebuild(language, documents)
            .inspect_err(|e| error!("Rebuilding {language} index failed: {e}"))
    }

    fn try_rebuild(&self, language: &str, documents: Vec<IndexedDocument>) -> Result<usize> {
        let total = documents.len();
        let mut writer = self.open_writer(language, OpenMode::Create)?;
        for (count, mut document) in documents.into_iter().enumerate() {
            document.refresh_id();
            writer.add_document(document)?;
            if (count + 1) % self.commit_interval == 0 {
                writer.commit()?;
            }
        }
        writer.close()?;
        info!("Rebuilt {language} index with {total} documents");
        Ok(total)
    }

    pub fn store_stop_words<S: AsRef<str>>(&self, language: &str, words: &[S]) -> Result<()> {
        self.analyzers
            .store_stop_words(language, words)
            .map(|_| ())
            .inspect_err(|e| error!("Storing {language} stop words failed: {e}"))
    }

    pub fn read_stop_words<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        registry::read_stop_words(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(dir: &TempDir) -> IndexManager {
        let config = EngineConfig::default().with_languages(["en", "it"]);
        IndexManager::standalone(dir.path(), &config)
    }

    #[test]
    fn test_layout() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        assert_eq!(manager.index_dir("en"), dir.path().join("en"));
        assert_eq!(manager.structure_path(), dir.path().join("structure.xml"));
        assert_eq!(
            manager.stop_word_path("it"),
            dir.path().join("stopwords").join("stop_it.txt")
        );
        assert!(!manager.has_index("en"));
        assert!(manager.open_reader("en").unwrap().is_none());
    }

    #[test]
    fn test_add_document_replicates_and_tokenizes() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);

        let added = manager
            .add_document("en", "The Quick Fox", &["Animals", "Fox"], 0, true)
            .unwrap();
        assert_eq!(added, 1);
        manager
            .add_document("en", "raw Body", &["Animals"], 3, false)
            .unwrap();

        let reader = manager.open_reader("en").unwrap().unwrap();
        assert_eq!(reader.num_docs(), 4);
        let documents = reader.documents();
        assert_eq!(documents[0].body, "quick fox");
        assert_eq!(documents[0].path.to_string(), "Animals>Fox");
        assert_eq!(documents[1].body, "raw Body");
        assert_ne!(documents[1].id, documents[2].id);
    }

    #[test]
    fn test_build_from_table_with_category_names() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let stop_file = dir.path().join("extra.txt");
        std::fs::write(&stop_file, "fox comment\n").unwrap();

        let rows = vec![
            TrainingRow::new(["Animals", "Fox"], "the quick fox jumps"),
            TrainingRow::new(["", "Fox"], "skipped"),
            TrainingRow::new(["Animals"], "  "),
        ];
        let written = manager
            .build_from_table(&rows, Some(&stop_file), "en", true)
            .unwrap();
        assert_eq!(written, 3);

        let documents = manager.open_reader("en").unwrap().unwrap().documents();
        assert_eq!(documents[0].body, "quick jumps");
        assert_eq!(documents[1].body, "Animals");
        assert_eq!(documents[1].path.depth(), 1);
        assert_eq!(documents[2].body, "Fox");
        assert_eq!(documents[2].path.depth(), 2);

        let stored = IndexManager::read_stop_words(manager.stop_word_path("en")).unwrap();
        assert_eq!(stored, vec!["fox"]);
    }

    #[test]
    fn test_break_write_lock_after_crashed_writer() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        assert!(!manager.break_write_lock("en").unwrap());
        manager.add_document("en", "alpha", &["A"], 1, false).unwrap();

        std::mem::forget(manager.open_writer("en", OpenMode::CreateOrAppend).unwrap());
        assert!(manager.add_document("en", "beta", &["A"], 1, false).is_err());

        assert!(manager.break_write_lock("en").unwrap());
        manager.add_document("en", "beta", &["A"], 1, false).unwrap();
        assert_eq!(manager.open_reader("en").unwrap().unwrap().num_docs(), 2);
    }

    #[test]
    fn test_remove_update_and_rebuild() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        manager.add_document("en", "alpha", &["A", "B"], 2, false).unwrap();
        manager.add_document("en", "beta", &["A", "C"], 1, false).unwrap();
        manager.add_document("it", "gamma", &["A", "B", "D"], 1, false).unwrap();

        assert_eq!(manager.remove_by_path(&["A", "B"]).unwrap(), 3);
        let reader = manager.open_reader("en").unwrap().unwrap();
        assert_eq!(reader.num_docs(), 1);
        let remaining = reader.documents().remove(0);
        assert_eq!(manager.open_reader("it").unwrap().unwrap().num_docs(), 0);

        assert!(manager.update_document_body("en", &remaining.id, "delta").unwrap());
        assert!(!manager.update_document_body("en", "missing", "x").unwrap());
        let updated = manager.open_reader("en").unwrap().unwrap().documents();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].id, remaining.id);
        assert_eq!(updated[0].body, "delta");

        let rebuilt = manager.rebuild_with_fresh_ids("en", updated.clone()).unwrap();
        assert_eq!(rebuilt, 1);
        let after = manager.open_reader("en").unwrap().unwrap().documents();
        assert_eq!(after.len(), 1);
        assert_ne!(after[0].id, remaining.id);

        assert_eq!(manager.remove_by_id("en", &after[0].id).unwrap(), 1);
        assert_eq!(manager.open_reader("en").unwrap().unwrap().num_docs(), 0);
    }
}
