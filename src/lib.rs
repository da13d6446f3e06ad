//! # Taxis
//!
//! Hierarchical text classification backed by per-language document indexes.
//!
//! ## Features
//!
//! - Category trees up to four levels deep, stored as `structure.xml`
//! - Per-node naive Bayes and k-nearest-neighbour classifiers
//! - Cascading classification with a confidence threshold
//! - Segmented per-language training indexes with a single-writer lock
//! - Configurable text analysis with per-language stop words
//! - Batch classification on a worker pool with cancellation

pub mod analysis;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod intern;
pub mod storage;
pub mod tree;
pub mod util;

pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::{
        BatchClassifier, BatchOptions, CancellationToken, ClassificationPath, MulticlassEngine,
        Technology,
    };
    pub use crate::error::{Result, TaxisError};
    pub use crate::index::IndexManager;
    pub use crate::tree::CategoryTree;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
