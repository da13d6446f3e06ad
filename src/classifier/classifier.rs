//! Classifier trait and shared result types.

use std::cmp::Ordering;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::classifier::corpus::{CorpusDocument, TrainingCorpus};
use crate::error::Result;
use crate::index::document::MAX_LEVELS;

/// One candidate label with its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Numeric category id.
    pub label: i32,
    pub score: f64,
}

impl ClassificationResult {
    pub fn new(label: i32, score: f64) -> Self {
        ClassificationResult { label, score }
    }
}

/// Sort by descending score, then ascending label for a stable order.
pub fn sort_results(results: &mut [ClassificationResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.label.cmp(&b.label))
    });
}

/// Which corpus documents a node trains on and which level labels them.
///
/// A document is in scope when its leading level ids equal `prefix`; its
/// label is the id at level `prefix.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrainingScope {
    prefix: Vec<i32>,
}

impl TrainingScope {
    /// The whole corpus, labeled by first-level ids.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn for_prefix(prefix: Vec<i32>) -> Self {
        TrainingScope { prefix }
    }

    pub fn prefix(&self) -> &[i32] {
        &self.prefix
    }

    /// Index of the level whose id labels documents.
    pub fn label_level(&self) -> usize {
        self.prefix.len()
    }

    /// Whether a node with this scope has a level below it to learn.
    pub fn is_trainable(&self) -> bool {
        self.label_level() < MAX_LEVELS
    }

    /// The training label of `document`, if it is in scope and labeled.
    pub fn label_of(&self, document: &CorpusDocument) -> Option<i32> {
        if !self.is_trainable() || !document.path.starts_with_ids(&self.prefix) {
            return None;
        }
        document.path.id(self.label_level())
    }
}

/// A statistical text classifier over numeric category labels.
pub trait TextClassifier: Send + Sync + Debug {
    /// Replace the model with one learned from the scoped part of `corpus`.
    fn train(&mut self, corpus: &TrainingCorpus, scope: &TrainingScope) -> Result<()>;

    /// Candidate labels for analyzed `terms`, best first. Empty when the
    /// model has nothing to say about the input.
    fn classify(&self, terms: &[String]) -> Result<Vec<ClassificationResult>>;

    fn name(&self) -> &'static str;

    fn is_trained(&self) -> bool;

    /// Distinct labels seen in training.
    fn label_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::document::{CategoryPath, category_id};

    #[test]
    fn test_sort_results() {
        let mut results = vec![
            ClassificationResult::new(3, 0.2),
            ClassificationResult::new(2, 0.7),
            ClassificationResult::new(1, 0.2),
        ];
        sort_results(&mut results);
        let labels: Vec<i32> = results.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec![2, 1, 3]);
    }

    #[test]
    fn test_scope_labels() {
        let document = CorpusDocument {
            path: CategoryPath::from_names(["A", "B"], None),
            terms: vec!["x".to_string()],
        };

        assert_eq!(TrainingScope::root().label_of(&document), Some(category_id("A")));

        let under_a = TrainingScope::for_prefix(vec![category_id("A")]);
        assert_eq!(under_a.label_level(), 1);
        assert_eq!(under_a.label_of(&document), Some(category_id("B")));

        let under_ab = TrainingScope::for_prefix(document.path.ids());
        assert_eq!(under_ab.label_of(&document), None);

        let under_c = TrainingScope::for_prefix(vec![category_id("C")]);
        assert_eq!(under_c.label_of(&document), None);

        let leaf = TrainingScope::for_prefix(vec![1, 2, 3, 4]);
        assert!(!leaf.is_trainable());
    }
}
