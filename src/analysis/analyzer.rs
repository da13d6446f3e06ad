//! Analyzer implementations that combine tokenizers and filters.
//!
//! - [`analyzer::Analyzer`] - The analyzer trait
//! - [`pipeline::PipelineAnalyzer`] - Tokenizer plus an ordered filter chain
//! - [`language::LanguageAnalyzer`] - Per-language analyzer used for indexing
//!   and classification

#[allow(clippy::module_inception)]
pub mod analyzer;
pub mod language;
pub mod pipeline;
