//! Statistical classifiers trained per category node.
//!
//! Every tree node owns one [`NaiveBayesClassifier`] and one
//! [`KnnClassifier`] per language, both trained on the slice of the
//! language corpus below the node and labeling documents by the numeric id
//! of the next category level.

pub mod bayes;
#[allow(clippy::module_inception)]
pub mod classifier;
pub mod corpus;
pub mod knn;

pub use bayes::NaiveBayesClassifier;
pub use classifier::{ClassificationResult, TextClassifier, TrainingScope};
pub use corpus::{CorpusDocument, TrainingCorpus};
pub use knn::KnnClassifier;
