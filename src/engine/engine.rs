//! The multiclass engine: per-language readers, the trained category tree
//! and cascading classification.
//!
//! ```no_run
//! use taxis::config::EngineConfig;
//! use taxis::engine::MulticlassEngine;
//!
//! let mut engine = MulticlassEngine::new(EngineConfig::default().with_languages(["en"]));
//! if engine.initialize("/data/classifier", 1, false) {
//!     for path in engine.bayes_classify("a match of the league", 0.5, "en").unwrap_or_default() {
//!         println!("{path}");
//!     }
//! }
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use log::{debug, error, info, warn};
use serde::Serialize;

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::analysis::analyzer::language::LanguageAnalyzer;
use crate::analysis::registry::AnalyzerRegistry;
use crate::analysis::token_filter::stop::default_stop_words;
use crate::classifier::{ClassificationResult, TrainingCorpus};
use crate::config::EngineConfig;
use crate::engine::path::{ClassificationPath, Technology};
use crate::error::{Result, TaxisError};
use crate::index::document::MAX_LEVELS;
use crate::index::manager::{IndexManager, STOP_WORD_DIR};
use crate::index::reader::IndexReader;
use crate::intern::InternPool;
use crate::tree::{CategoryTree, NodeId};

/// Lifecycle of a [`MulticlassEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Reinitializing,
}

/// One stored training example as listed by [`MulticlassEngine::documents`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRow {
    pub id: String,
    pub body: String,
    pub names: Vec<String>,
}

#[derive(Debug)]
pub struct MulticlassEngine {
    config: EngineConfig,
    pool: Arc<InternPool>,
    state: EngineState,
    manager: Option<IndexManager>,
    tree: CategoryTree,
    readers: AHashMap<String, IndexReader>,
    categories: BTreeSet<Arc<str>>,
}

impl MulticlassEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_pool(config, Arc::new(InternPool::new()))
    }

    pub fn with_pool(config: EngineConfig, pool: Arc<InternPool>) -> Self {
        let tree = CategoryTree::new(config.k, Arc::clone(&pool));
        MulticlassEngine {
            config,
            pool,
            state: EngineState::Uninitialized,
            manager: None,
            tree,
            readers: AHashMap::new(),
            categories: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    pub fn tree(&self) -> &CategoryTree {
        &self.tree
    }

    pub fn structure_root(&self) -> Option<&Path> {
        self.manager.as_ref().map(IndexManager::root)
    }

    /// Index operations over the current structure root.
    pub fn index_manager(&self) -> Result<&IndexManager> {
        self.manager
            .as_ref()
            .ok_or_else(|| TaxisError::invalid_argument("engine has no structure root"))
    }

    /// Category names met while scanning the indexes.
    pub fn categories(&self) -> Vec<Arc<str>> {
        self.categories.iter().cloned().collect()
    }

    /// Load the tree of `structure_root`, train it from every language
    /// index and persist it back. Returns whether every language was
    /// initialized without errors; `false` without any change if the root
    /// is not a directory.
    pub fn initialize<P: AsRef<Path>>(
        &mut self,
        structure_root: P,
        k: usize,
        force_reindex: bool,
    ) -> bool {
        let root = structure_root.as_ref();
        if !root.is_dir() {
            warn!("Structure root {root:?} is not a directory");
            return false;
        }

        self.state = match self.state {
            EngineState::Uninitialized | EngineState::Initializing => EngineState::Initializing,
            EngineState::Ready | EngineState::Reinitializing => EngineState::Reinitializing,
        };
        self.close_all_readers();
        self.categories.clear();

        let manager = self.build_manager(root.to_path_buf());
        let structure_path = manager.structure_path();
        let k = k.max(1);
        self.tree = CategoryTree::load_or_empty(&structure_path, k, Arc::clone(&self.pool));
        self.manager = Some(manager.clone());

        let mut clean = true;
        for language in manager.languages() {
            if !manager.has_index(language) {
                debug!("No {language} index under {root:?}");
                continue;
            }
            if let Err(e) = self.initialize_language(&manager, language, force_reindex) {
                error!("Initializing {language} failed: {e}");
                clean = false;
            }
        }

        if let Err(e) = self.tree.store(&structure_path) {
            error!("Storing the category tree failed: {e}");
            clean = false;
        }
        self.state = EngineState::Ready;
        info!(
            "Engine ready: {} nodes, {} categories, languages {:?}",
            self.tree.node_count(),
            self.categories.len(),
            self.readers.keys().collect::<Vec<_>>()
        );
        clean
    }

    fn build_manager(&self, root: PathBuf) -> IndexManager {
        let analyzers = AnalyzerRegistry::new(root.join(STOP_WORD_DIR))
            .with_token_pattern(self.config.token_pattern.clone());
        IndexManager::new(root, &self.config, Arc::new(analyzers), Arc::clone(&self.pool))
    }

    fn initialize_language(
        &mut self,
        manager: &IndexManager,
        language: &str,
        force_reindex: bool,
    ) -> Result<()> {
        self.readers.remove(language);
        let Some(reader) = manager.open_reader(language)? else {
            return Ok(());
        };
        let analyzer = manager.analyzers().get(language)?;
        info!(
            "Initializing {language}: {} live documents, generation {}",
            reader.num_docs(),
            reader.generation()
        );

        let corpus = TrainingCorpus::from_reader(&reader, &*analyzer)?;
        let root = self.tree.root();
        self.tree.train_with_corpus(root, &corpus, language)?;

        let mut trained: AHashSet<NodeId> = AHashSet::new();
        trained.insert(root);
        // Id-less documents get one through a rewrite with fresh ids.
        let rewrite = force_reindex || reader.live_documents().any(|document| !document.has_id());
        let mut reindex = Vec::new();
        for document in reader.live_documents() {
            if rewrite {
                reindex.push(document.clone());
            }

            let mut parent = root;
            for level in document.path.iter() {
                let child = match self.tree.get_or_create_child(parent, &level.name) {
                    Ok(child) => child,
                    Err(e) => {
                        warn!("Skipping {} for document {}: {e}", document.path, document.id);
                        break;
                    }
                };
                if trained.insert(child) {
                    self.tree.train_with_corpus(child, &corpus, language)?;
                    self.categories.insert(Arc::clone(&level.name));
                }
                parent = child;
            }
        }
        info!("Trained {} nodes for {language}", trained.len());

        if rewrite {
            drop(reader);
            manager.rebuild_with_fresh_ids(language, reindex)?;
            if let Some(reader) = manager.open_reader(language)? {
                self.readers.insert(language.to_string(), reader);
            }
        } else {
            self.readers.insert(language.to_string(), reader);
        }
        Ok(())
    }

    /// Drop every open reader snapshot.
    pub fn close_all_readers(&mut self) {
        if !self.readers.is_empty() {
            debug!("Closing {} readers", self.readers.len());
        }
        self.readers.clear();
    }

    /// Classify `text` from the root down. `None` while the engine is not
    /// ready or when `language` has no trained root.
    pub fn classify(
        &self,
        text: &str,
        threshold: f64,
        language: &str,
        use_knn: bool,
    ) -> Option<Vec<ClassificationPath>> {
        if !self.is_ready() {
            debug!("Classification requested before initialization");
            return None;
        }
        if !self.tree.root_node().is_trained(language) {
            debug!("No trained classifiers for {language}");
            return None;
        }
        let analyzer = self
            .analyzer(language)
            .inspect_err(|e| error!("No analyzer for {language}: {e}"))
            .ok()?;

        analyzer
            .terms(text)
            .and_then(|terms| self.classify_terms(&terms, threshold, language, use_knn))
            .inspect_err(|e| error!("Classification in {language} failed: {e}"))
            .ok()
    }

    /// Naive Bayes paths: the best first-level guess, and the second best
    /// when it reaches `threshold`.
    pub fn bayes_classify(
        &self,
        text: &str,
        threshold: f64,
        language: &str,
    ) -> Option<Vec<ClassificationPath>> {
        self.classify(text, threshold, language, false)
    }

    /// The nearest-neighbour path of the best guess.
    pub fn knn_classify(
        &self,
        text: &str,
        threshold: f64,
        language: &str,
    ) -> Option<ClassificationPath> {
        self.classify(text, threshold, language, true)?
            .into_iter()
            .next()
    }

    fn classify_terms(
        &self,
        terms: &[String],
        threshold: f64,
        language: &str,
        use_knn: bool,
    ) -> Result<Vec<ClassificationPath>> {
        let root = self.tree.root();
        let Some(classifiers) = self.tree.root_node().classifiers(language) else {
            return Ok(Vec::new());
        };
        let mut guesses = classifiers.get(use_knn).classify(terms)?.into_iter();

        let mut paths = Vec::new();
        if let Some(best) = guesses.next() {
            paths.push(self.cascade(root, best, terms, threshold, language, use_knn)?);
        }
        if !use_knn
            && let Some(second) = guesses.next()
            && second.score >= threshold
        {
            paths.push(self.cascade(root, second, terms, threshold, language, use_knn)?);
        }
        paths.retain(|path| !path.is_empty());
        Ok(paths)
    }

    /// Follow `guess` from `start`: record each reached level and descend
    /// while the chosen node has children and the score reaches `threshold`.
    fn cascade(
        &self,
        start: NodeId,
        guess: ClassificationResult,
        terms: &[String],
        threshold: f64,
        language: &str,
        use_knn: bool,
    ) -> Result<ClassificationPath> {
        let mut path = ClassificationPath::new(Technology::from_knn(use_knn));
        let mut node = start;
        let mut guess = guess;

        for depth in 0..MAX_LEVELS {
            let Some(current) = self.tree.node(node) else {
                break;
            };
            let Some(name) = current.name_from_id(guess.label) else {
                debug!("Unknown label {} below {}", guess.label, current.name());
                break;
            };
            path.add_result(Arc::clone(name), guess.score, depth);

            let Some(chosen_id) = current.child(name) else {
                break;
            };
            let Some(chosen) = self.tree.node(chosen_id) else {
                break;
            };
            if !chosen.has_children() || guess.score < threshold {
                break;
            }
            let Some(classifiers) = chosen.classifiers(language) else {
                break;
            };
            let Some(next) = classifiers.get(use_knn).classify(terms)?.into_iter().next() else {
                break;
            };
            node = chosen_id;
            guess = next;
        }
        Ok(path)
    }

    /// The cached analyzer of `language`.
    pub fn analyzer(&self, language: &str) -> Result<Arc<LanguageAnalyzer>> {
        self.index_manager()?.analyzers().get(language)
    }

    /// The analyzed form of `text`, terms joined by single spaces. Empty
    /// before initialization.
    pub fn tokenize(&self, text: &str, language: &str) -> Result<String> {
        if self.manager.is_none() {
            return Ok(String::new());
        }
        self.analyzer(language)?.tokenize_to_string(text)
    }

    /// Effective stop words of `language`, sorted.
    pub fn stop_words(&self, language: &str) -> Result<Vec<String>> {
        Ok(self.analyzer(language)?.stop_words())
    }

    /// Built-in stop words of `language`, sorted.
    pub fn default_stop_words(&self, language: &str) -> Vec<String> {
        let mut words: Vec<String> = default_stop_words(language).iter().cloned().collect();
        words.sort();
        words
    }

    /// Persist the custom stop words of `language` and use them from now on.
    pub fn store_stop_words<S: AsRef<str>>(&self, language: &str, words: &[S]) -> Result<()> {
        self.index_manager()?.store_stop_words(language, words)
    }

    pub fn remove_document(&mut self, id: &str, language: &str) -> Result<u64> {
        self.close_all_readers();
        self.index_manager()?.remove_by_id(language, id)
    }

    pub fn remove_documents<S: AsRef<str>>(&mut self, ids: &[S], language: &str) -> Result<u64> {
        self.close_all_readers();
        self.index_manager()?.remove_by_ids(language, ids)
    }

    /// Replace the body of document `id` with the analyzed form of `body`.
    pub fn update_document_body(&mut self, id: &str, body: &str, language: &str) -> Result<bool> {
        let tokenized = self.analyzer(language)?.tokenize_to_string(body)?;
        self.readers.remove(language);
        self.index_manager()?
            .update_document_body(language, id, &tokenized)
    }

    /// Stored examples of `language`.
    pub fn documents(&self, language: &str) -> Result<Vec<DocumentRow>> {
        let fresh;
        let reader = match self.readers.get(language) {
            Some(reader) => reader,
            None => {
                fresh = self.index_manager()?.open_reader(language)?;
                match fresh.as_ref() {
                    Some(reader) => reader,
                    None => return Ok(Vec::new()),
                }
            }
        };
        Ok(reader
            .live_documents()
            .map(|document| DocumentRow {
                id: document.id.clone(),
                body: document.body.clone(),
                names: document.path.names().into_iter().map(str::to_string).collect(),
            })
            .collect())
    }

    /// Add a node by its full path and persist the tree.
    pub fn add_node<S: AsRef<str>>(&mut self, path: &[S]) -> Result<NodeId> {
        let id = self.tree.add_node(path)?;
        self.store_structure()?;
        Ok(id)
    }

    /// Remove the node at `path` with its subtree and persist the tree.
    pub fn remove_node<S: AsRef<str>>(&mut self, path: &[S]) -> Result<bool> {
        let removed = self.tree.remove_node(path);
        if removed {
            self.store_structure()?;
        }
        Ok(removed)
    }

    /// Remove a category everywhere: its documents from every language
    /// index and its node from the tree.
    pub fn remove_category<S: AsRef<str>>(&mut self, path: &[S]) -> Result<u64> {
        self.close_all_readers();
        let removed = self.index_manager()?.remove_by_path(path)?;
        self.remove_node(path)?;
        Ok(removed)
    }

    fn store_structure(&self) -> Result<()> {
        let path = self.index_manager()?.structure_path();
        self.tree.store(path)
    }
}
