//! Multinomial naive Bayes.
//!
//! Term likelihoods use Laplace smoothing over the training vocabulary.
//! Scores are the label posteriors normalized to sum to one, so a node with
//! a single label always answers with score 1.0.

use ahash::{AHashMap, AHashSet};
use log::debug;

use crate::classifier::classifier::{
    ClassificationResult, TextClassifier, TrainingScope, sort_results,
};
use crate::classifier::corpus::TrainingCorpus;
use crate::error::Result;

#[derive(Debug, Clone)]
struct LabelModel {
    label: i32,
    log_prior: f64,
    term_log_likelihoods: AHashMap<String, f64>,
    unseen_log_likelihood: f64,
}

#[derive(Debug, Clone, Default)]
pub struct NaiveBayesClassifier {
    labels: Vec<LabelModel>,
    vocabulary_size: usize,
    trained: bool,
}

impl NaiveBayesClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    fn is_known(&self, term: &str) -> bool {
        self.labels
            .iter()
            .any(|model| model.term_log_likelihoods.contains_key(term))
    }
}

impl TextClassifier for NaiveBayesClassifier {
    fn train(&mut self, corpus: &TrainingCorpus, scope: &TrainingScope) -> Result<()> {
        let mut doc_counts: AHashMap<i32, usize> = AHashMap::new();
        let mut term_counts: AHashMap<i32, AHashMap<&str, usize>> = AHashMap::new();
        let mut vocabulary: AHashSet<&str> = AHashSet::new();
        let mut total_docs = 0usize;

        for (label, document) in corpus.labeled(scope) {
            total_docs += 1;
            *doc_counts.entry(label).or_default() += 1;
            let counts = term_counts.entry(label).or_default();
            for term in &document.terms {
                *counts.entry(term.as_str()).or_default() += 1;
                vocabulary.insert(term.as_str());
            }
        }

        let vocabulary_size = vocabulary.len();
        let mut labels = Vec::with_capacity(doc_counts.len());
        for (label, docs) in doc_counts {
            let counts = term_counts.remove(&label).unwrap_or_default();
            let total_terms: usize = counts.values().sum();
            let denominator = (total_terms + vocabulary_size) as f64;
            let denominator = if denominator > 0.0 { denominator } else { 1.0 };

            let term_log_likelihoods = counts
                .into_iter()
                .map(|(term, count)| (term.to_string(), ((count + 1) as f64 / denominator).ln()))
                .collect();

            labels.push(LabelModel {
                label,
                log_prior: (docs as f64 / total_docs as f64).ln(),
                term_log_likelihoods,
                unseen_log_likelihood: (1.0 / denominator).ln(),
            });
        }
        labels.sort_by_key(|model| model.label);

        debug!(
            "Trained naive Bayes on {total_docs} documents, {} labels, {vocabulary_size} terms",
            labels.len()
        );
        self.labels = labels;
        self.vocabulary_size = vocabulary_size;
        self.trained = true;
        Ok(())
    }

    fn classify(&self, terms: &[String]) -> Result<Vec<ClassificationResult>> {
        if self.labels.is_empty() {
            return Ok(Vec::new());
        }

        let log_posteriors: Vec<f64> = self
            .labels
            .iter()
            .map(|model| {
                let mut score = model.log_prior;
                for term in terms {
                    match model.term_log_likelihoods.get(term) {
                        Some(log_likelihood) => score += log_likelihood,
                        // Terms unknown to every label carry no evidence.
                        None if self.is_known(term) => score += model.unseen_log_likelihood,
                        None => {}
                    }
                }
                score
            })
            .collect();

        let max = log_posteriors
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let exponentials: Vec<f64> = log_posteriors.iter().map(|lp| (lp - max).exp()).collect();
        let sum: f64 = exponentials.iter().sum();

        let mut results: Vec<ClassificationResult> = self
            .labels
            .iter()
            .zip(exponentials)
            .map(|(model, e)| ClassificationResult::new(model.label, e / sum))
            .collect();
        sort_results(&mut results);
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "bayes"
    }

    fn is_trained(&self) -> bool {
        self.trained
    }

    fn label_count(&self) -> usize {
        self.labels.len()
    }
}
