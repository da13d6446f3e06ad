//! Batch classification over a bounded worker pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use log::{debug, info};
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::engine::engine::MulticlassEngine;
use crate::engine::path::ClassificationPath;
use crate::error::{Result, TaxisError};

/// Cooperative cancellation flag shared between the caller and the workers.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Parameters shared by every text of a batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub language: String,
    pub threshold: f64,
    pub use_knn: bool,
}

impl BatchOptions {
    pub fn new<S: Into<String>>(language: S, threshold: f64) -> Self {
        BatchOptions {
            language: language.into(),
            threshold,
            use_knn: false,
        }
    }

    pub fn with_knn(mut self, use_knn: bool) -> Self {
        self.use_knn = use_knn;
        self
    }
}

/// Paths of one input text; `index` is its position in the batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub index: usize,
    pub paths: Vec<ClassificationPath>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Classified items in input order. Texts skipped after cancellation
    /// have no entry.
    pub items: Vec<BatchItem>,
    pub total: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl BatchOutcome {
    pub fn completed(&self) -> usize {
        self.items.len()
    }
}

pub struct BatchClassifier {
    thread_pool: ThreadPool,
    workers: usize,
}

impl BatchClassifier {
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("taxis-batch-{i}"))
            .build()
            .map_err(|e| TaxisError::internal(format!("Failed to create thread pool: {e}")))?;
        Ok(BatchClassifier {
            thread_pool,
            workers,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(config.workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Classify every text of `texts`. Workers check `cancel` before taking
    /// the next text; a text already being classified still completes.
    pub fn classify_all<S>(
        &self,
        engine: &MulticlassEngine,
        texts: &[S],
        options: &BatchOptions,
        cancel: &CancellationToken,
        progress: Option<&Sender<BatchProgress>>,
    ) -> BatchOutcome
    where
        S: AsRef<str> + Sync,
    {
        let start = Instant::now();
        let total = texts.len();
        let next = AtomicUsize::new(0);
        let completed = AtomicUsize::new(0);
        let items = Mutex::new(Vec::with_capacity(total));

        self.thread_pool.scope(|scope| {
            for _ in 0..self.workers.min(total) {
                scope.spawn(|_| {
                    while !cancel.is_cancelled() {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(text) = texts.get(index) else {
                            break;
                        };
                        let paths = engine
                            .classify(
                                text.as_ref(),
                                options.threshold,
                                &options.language,
                                options.use_knn,
                            )
                            .unwrap_or_default();
                        items.lock().push(BatchItem { index, paths });

                        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                        if let Some(progress) = progress {
                            // A dropped receiver only stops the reports.
                            let _ = progress.send(BatchProgress {
                                completed: done,
                                total,
                            });
                        }
                    }
                });
            }
        });

        let mut items = items.into_inner();
        items.sort_by_key(|item| item.index);
        let cancelled = cancel.is_cancelled() && items.len() < total;
        if cancelled {
            info!("Batch cancelled after {} of {total} texts", items.len());
        } else {
            debug!("Classified {total} texts in {:?}", start.elapsed());
        }

        BatchOutcome {
            items,
            total,
            cancelled,
            elapsed: start.elapsed(),
        }
    }
}

impl std::fmt::Debug for BatchClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchClassifier")
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexManager;
    use tempfile::TempDir;

    fn ready_engine(dir: &TempDir) -> MulticlassEngine {
        let config = EngineConfig::default().with_languages(["en"]);
        let manager = IndexManager::standalone(dir.path(), &config);
        manager
            .add_document("en", "apple banana fruit", &["Fruit"], 2, true)
            .unwrap();
        manager
            .add_document("en", "carrot potato vegetable", &["Vegetable"], 2, true)
            .unwrap();

        let mut engine = MulticlassEngine::new(config);
        assert!(engine.initialize(dir.path(), 1, false));
        engine
    }

    #[test]
    fn test_classify_all_keeps_input_order() {
        let dir = TempDir::new().unwrap();
        let engine = ready_engine(&dir);
        let batch = BatchClassifier::new(3).unwrap();
        let texts = ["banana", "potato", "apple fruit", "carrot"];
        let (sender, receiver) = crossbeam_channel::unbounded();

        let outcome = batch.classify_all(
            &engine,
            &texts,
            &BatchOptions::new("en", 0.5),
            &CancellationToken::new(),
            Some(&sender),
        );
        drop(sender);

        assert!(!outcome.cancelled);
        assert_eq!(outcome.completed(), 4);
        let leaves: Vec<String> = outcome
            .items
            .iter()
            .map(|item| item.paths[0].to_class_string())
            .collect();
        assert_eq!(leaves, vec!["Fruit", "Vegetable", "Fruit", "Vegetable"]);

        let reports: Vec<BatchProgress> = receiver.iter().collect();
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().any(|p| p.completed == 4 && p.total == 4));
    }

    #[test]
    fn test_cancelled_batch_yields_nothing() {
        let dir = TempDir::new().unwrap();
        let engine = ready_engine(&dir);
        let batch = BatchClassifier::new(2).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = batch.classify_all(
            &engine,
            &["banana", "potato"],
            &BatchOptions::new("en", 0.5).with_knn(true),
            &token,
            None,
        );
        assert!(outcome.cancelled);
        assert!(outcome.items.is_empty());
        assert_eq!(outcome.total, 2);
    }

    #[test]
    fn test_uninitialized_engine_gives_empty_paths() {
        let engine = MulticlassEngine::new(EngineConfig::default());
        let batch = BatchClassifier::new(1).unwrap();
        let outcome = batch.classify_all(
            &engine,
            &["anything"],
            &BatchOptions::new("en", 0.5),
            &CancellationToken::new(),
            None,
        );
        assert_eq!(outcome.completed(), 1);
        assert!(outcome.items[0].paths.is_empty());
    }
}
