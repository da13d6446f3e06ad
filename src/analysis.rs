//! Text analysis: tokenizers, token filters and analyzers.
//!
//! Documents are analyzed before they are stored in a language index, and
//! classification input is analyzed with the same per-language analyzer so
//! both sides see the same terms.

pub mod analyzer;
pub mod registry;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::analyzer::Analyzer;
pub use analyzer::language::LanguageAnalyzer;
pub use analyzer::pipeline::PipelineAnalyzer;
pub use registry::AnalyzerRegistry;
pub use token::{Token, TokenStream};
