//! Analyzed training documents of one language.

use rayon::prelude::*;

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::classifier::classifier::TrainingScope;
use crate::error::Result;
use crate::index::document::CategoryPath;
use crate::index::reader::IndexReader;

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusDocument {
    pub path: CategoryPath,
    pub terms: Vec<String>,
}

/// Every active document of a reader, analyzed once and shared by all
/// node classifiers of a language.
#[derive(Debug, Clone, Default)]
pub struct TrainingCorpus {
    documents: Vec<CorpusDocument>,
}

impl TrainingCorpus {
    pub fn new(documents: Vec<CorpusDocument>) -> Self {
        TrainingCorpus { documents }
    }

    /// Analyze the bodies of the active live documents of `reader`.
    pub fn from_reader(reader: &IndexReader, analyzer: &dyn Analyzer) -> Result<Self> {
        let live: Vec<_> = reader
            .live_documents()
            .filter(|document| document.is_active())
            .collect();
        let documents = live
            .par_iter()
            .map(|document| {
                Ok(CorpusDocument {
                    path: document.path.clone(),
                    terms: analyzer.terms(&document.body)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TrainingCorpus { documents })
    }

    pub fn documents(&self) -> &[CorpusDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents in `scope` paired with their label.
    pub fn labeled<'a>(
        &'a self,
        scope: &'a TrainingScope,
    ) -> impl Iterator<Item = (i32, &'a CorpusDocument)> + 'a {
        self.documents
            .iter()
            .filter_map(move |document| scope.label_of(document).map(|label| (label, document)))
    }
}
