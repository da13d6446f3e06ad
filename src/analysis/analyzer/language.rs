//! Per-language analyzer.
//!
//! Every index language gets a [`LanguageAnalyzer`]: Unicode word (or
//! configured regex) tokenization, lowercasing, and removal of the language's
//! default stop words merged with the custom stop words stored for it.
//!
//! ```
//! use taxis::analysis::analyzer::analyzer::Analyzer;
//! use taxis::analysis::analyzer::language::LanguageAnalyzer;
//!
//! let analyzer = LanguageAnalyzer::new("it", ["calcio"], None).unwrap();
//! let text = analyzer.tokenize_to_string("  Il Calcio della Domenica ").unwrap();
//!
//! assert_eq!(text, "domenica");
//! ```

use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::stop::{StopFilter, default_stop_words};
use crate::analysis::tokenizer::Tokenizer;
use crate::analysis::tokenizer::regex::RegexTokenizer;
use crate::analysis::tokenizer::unicode_word::UnicodeWordTokenizer;
use crate::error::Result;

pub struct LanguageAnalyzer {
    language: String,
    stop_filter: StopFilter,
    inner: PipelineAnalyzer,
}

impl LanguageAnalyzer {
    /// Build the analyzer for `language`. `custom_stop_words` are merged with
    /// the default list and matched case-insensitively. When `token_pattern`
    /// is set, tokens are the pattern's matches instead of Unicode words.
    pub fn new<I, S>(language: &str, custom_stop_words: I, token_pattern: Option<&str>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stop_words: HashSet<String> = default_stop_words(language).clone();
        stop_words.extend(
            custom_stop_words
                .into_iter()
                .map(|word| word.as_ref().trim().to_lowercase())
                .filter(|word| !word.is_empty()),
        );

        let tokenizer: Arc<dyn Tokenizer> = match token_pattern {
            Some(pattern) => Arc::new(RegexTokenizer::with_pattern(pattern)?),
            None => Arc::new(UnicodeWordTokenizer::new()),
        };
        let stop_filter = StopFilter::with_stop_words(stop_words);
        let inner = PipelineAnalyzer::new(tokenizer)
            .add_filter(Arc::new(LowercaseFilter::new()))
            .add_filter(Arc::new(stop_filter.clone()))
            .with_name(format!("language_{language}"));

        Ok(LanguageAnalyzer {
            language: language.to_string(),
            stop_filter,
            inner,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Effective stop words, sorted.
    pub fn stop_words(&self) -> Vec<String> {
        let mut words: Vec<String> = self.stop_filter.stop_words().iter().cloned().collect();
        words.sort();
        words
    }

    /// Lowercase, trim and analyze `text`, joining the surviving terms with
    /// single spaces. This is the body form stored for tokenized documents.
    pub fn tokenize_to_string(&self, text: &str) -> Result<String> {
        let normalized = text.to_lowercase();
        Ok(self.terms(normalized.trim())?.join(" "))
    }
}

impl Analyzer for LanguageAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        "language"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Debug for LanguageAnalyzer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageAnalyzer")
            .field("language", &self.language)
            .field("stop_words", &self.stop_filter.len())
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::token::Token;

    #[test]
    fn test_language_analyzer() {
        let analyzer = LanguageAnalyzer::new("en", Vec::<String>::new(), None).unwrap();

        let tokens: Vec<Token> = analyzer
            .analyze("Hello the world and test")
            .unwrap()
            .collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[2].text, "test");
    }

    #[test]
    fn test_custom_stop_words_are_case_insensitive() {
        let analyzer = LanguageAnalyzer::new("en", ["Widget ", ""], None).unwrap();

        assert_eq!(analyzer.tokenize_to_string("Big WIDGET sale").unwrap(), "big sale");
        assert!(analyzer.stop_words().contains(&"widget".to_string()));
        assert!(!analyzer.stop_words().contains(&String::new()));
    }

    #[test]
    fn test_regex_token_pattern() {
        let analyzer = LanguageAnalyzer::new("xx", Vec::<String>::new(), Some(r"[a-z]+-\d+")).unwrap();

        assert_eq!(analyzer.tokenize_to_string("Ref ABC-12 and x-3").unwrap(), "abc-12 x-3");
        assert!(analyzer.stop_words().is_empty());
    }

    #[test]
    fn test_stop_words_sorted() {
        let analyzer = LanguageAnalyzer::new("xx", ["b", "a", "c"], None).unwrap();
        assert_eq!(analyzer.stop_words(), vec!["a", "b", "c"]);
    }
}
