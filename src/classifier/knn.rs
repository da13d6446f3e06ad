//! k-nearest-neighbour classification over TF-IDF vectors.
//!
//! Training documents are weighted with `tf * idf`, where
//! `idf = ln((N + 1) / (df + 1)) + 1`, and L2-normalized. A query retrieves
//! the `k` most cosine-similar documents; each label present among them
//! scores `count * (mean similarity / best similarity) / retrieved`, so a
//! unanimous neighbourhood yields 1.0.

use std::cmp::Ordering;

use ahash::AHashMap;
use log::debug;

use crate::classifier::classifier::{
    ClassificationResult, TextClassifier, TrainingScope, sort_results,
};
use crate::classifier::corpus::TrainingCorpus;
use crate::error::{Result, TaxisError};

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: u32,
    weight: f64,
}

#[derive(Debug, Clone)]
pub struct KnnClassifier {
    k: usize,
    idf: AHashMap<String, f64>,
    postings: AHashMap<String, Vec<Posting>>,
    labels: Vec<i32>,
    label_count: usize,
    trained: bool,
}

impl KnnClassifier {
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(TaxisError::classifier("k must be at least 1"));
        }
        Ok(KnnClassifier {
            k,
            idf: AHashMap::new(),
            postings: AHashMap::new(),
            labels: Vec::new(),
            label_count: 0,
            trained: false,
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Training documents held by the model.
    pub fn doc_count(&self) -> usize {
        self.labels.len()
    }

    fn weights<'t>(&self, terms: &'t [String]) -> AHashMap<&'t str, f64> {
        let mut frequencies: AHashMap<&str, f64> = AHashMap::new();
        for term in terms {
            if self.idf.contains_key(term) {
                *frequencies.entry(term.as_str()).or_default() += 1.0;
            }
        }
        let mut weights: AHashMap<&str, f64> = frequencies
            .into_iter()
            .map(|(term, tf)| (term, tf * self.idf.get(term).copied().unwrap_or(0.0)))
            .collect();
        normalize(&mut weights);
        weights
    }
}

fn normalize(weights: &mut AHashMap<&str, f64>) {
    let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for weight in weights.values_mut() {
            *weight /= norm;
        }
    }
}

impl TextClassifier for KnnClassifier {
    fn train(&mut self, corpus: &TrainingCorpus, scope: &TrainingScope) -> Result<()> {
        let documents: Vec<_> = corpus.labeled(scope).collect();
        let total = documents.len() as f64;

        let mut document_frequency: AHashMap<&str, usize> = AHashMap::new();
        for (_, document) in &documents {
            let mut seen: Vec<&str> = document.terms.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        self.idf = document_frequency
            .into_iter()
            .map(|(term, df)| {
                let idf = ((total + 1.0) / (df as f64 + 1.0)).ln() + 1.0;
                (term.to_string(), idf)
            })
            .collect();

        let mut postings: AHashMap<String, Vec<Posting>> = AHashMap::new();
        let mut labels = Vec::with_capacity(documents.len());
        for (doc, (label, document)) in documents.iter().enumerate() {
            for (term, weight) in self.weights(&document.terms) {
                postings.entry(term.to_string()).or_default().push(Posting {
                    doc: doc as u32,
                    weight,
                });
            }
            labels.push(*label);
        }

        let mut distinct = labels.clone();
        distinct.sort_unstable();
        distinct.dedup();

        debug!(
            "Trained KNN (k={}) on {} documents, {} labels, {} terms",
            self.k,
            labels.len(),
            distinct.len(),
            self.idf.len()
        );
        self.postings = postings;
        self.labels = labels;
        self.label_count = distinct.len();
        self.trained = true;
        Ok(())
    }

    fn classify(&self, terms: &[String]) -> Result<Vec<ClassificationResult>> {
        let query = self.weights(terms);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut similarities: AHashMap<u32, f64> = AHashMap::new();
        for (term, query_weight) in &query {
            if let Some(postings) = self.postings.get(*term) {
                for posting in postings {
                    *similarities.entry(posting.doc).or_default() += query_weight * posting.weight;
                }
            }
        }

        let mut neighbours: Vec<(u32, f64)> = similarities
            .into_iter()
            .filter(|(_, similarity)| *similarity > 0.0)
            .collect();
        neighbours.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        neighbours.truncate(self.k);

        let Some(&(_, best)) = neighbours.first() else {
            return Ok(Vec::new());
        };
        let retrieved = neighbours.len() as f64;

        let mut per_label: AHashMap<i32, (usize, f64)> = AHashMap::new();
        for (doc, similarity) in &neighbours {
            let Some(&label) = self.labels.get(*doc as usize) else {
                continue;
            };
            let entry = per_label.entry(label).or_default();
            entry.0 += 1;
            entry.1 += similarity;
        }

        let mut results: Vec<ClassificationResult> = per_label
            .into_iter()
            .map(|(label, (count, sum))| {
                let mean = sum / count as f64;
                ClassificationResult::new(label, count as f64 * (mean / best) / retrieved)
            })
            .collect();
        sort_results(&mut results);
        Ok(results)
    }

    fn name(&self) -> &'static str {
        "knn"
    }

    fn is_trained(&self) -> bool {
        self.trained
    }

    fn label_count(&self) -> usize {
        self.label_count
    }
}
