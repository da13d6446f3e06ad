//! Training and cascading classification over the category tree.
//!
//! [`MulticlassEngine`] owns the per-language readers and the trained
//! [`CategoryTree`](crate::tree::CategoryTree); [`BatchClassifier`] runs it
//! over many texts on a worker pool.

pub mod batch;
#[allow(clippy::module_inception)]
pub mod engine;
pub mod path;

pub use batch::{BatchClassifier, BatchOptions, BatchOutcome, BatchProgress, CancellationToken};
pub use engine::{DocumentRow, EngineState, MulticlassEngine};
pub use path::{ClassificationPath, PathStep, Technology};
