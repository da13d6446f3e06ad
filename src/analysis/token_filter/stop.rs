//! Stop filter implementation.
//!
//! Removes common words that carry no category signal. Default stop word
//! lists ship for every built-in language; custom lists are merged on top of
//! them by [`LanguageAnalyzer`](crate::analysis::analyzer::language::LanguageAnalyzer).
//!
//! # Examples
//!
//! ```
//! use taxis::analysis::token_filter::Filter;
//! use taxis::analysis::token_filter::stop::StopFilter;
//! use taxis::analysis::token::Token;
//!
//! let filter = StopFilter::for_language("en");
//! let tokens = vec![
//!     Token::new("the", 0),
//!     Token::new("quick", 1),
//!     Token::new("brown", 2)
//! ];
//!
//! let result: Vec<_> = filter.filter(Box::new(tokens.into_iter()))
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(result.len(), 2);
//! assert_eq!(result[0].text, "quick");
//! ```

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::Result;

const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

const DEFAULT_ITALIAN_STOP_WORDS: &[&str] = &[
    "a", "ad", "al", "alla", "alle", "allo", "agli", "ai", "anche", "che", "chi", "ci", "come",
    "con", "cui", "da", "dal", "dalla", "dalle", "dallo", "dagli", "dai", "del", "della", "delle",
    "dello", "degli", "dei", "di", "e", "ed", "gli", "ha", "hanno", "ho", "i", "il", "in", "io",
    "la", "le", "lo", "ma", "mi", "ne", "nel", "nella", "nelle", "nello", "negli", "nei", "noi",
    "non", "o", "per", "più", "quale", "quando", "questo", "questa", "quello", "quella", "se",
    "si", "sono", "su", "sul", "sulla", "sulle", "sullo", "sugli", "sui", "ti", "tra", "un",
    "una", "uno", "vi", "è",
];

const DEFAULT_FRENCH_STOP_WORDS: &[&str] = &[
    "au", "aux", "avec", "ce", "ces", "dans", "de", "des", "du", "elle", "en", "et", "eux", "il",
    "je", "la", "le", "les", "leur", "lui", "ma", "mais", "me", "même", "mes", "moi", "mon", "ne",
    "nos", "notre", "nous", "on", "ou", "par", "pas", "pour", "qu", "que", "qui", "sa", "se",
    "ses", "son", "sur", "ta", "te", "tes", "toi", "ton", "tu", "un", "une", "vos", "votre",
    "vous", "c", "d", "j", "l", "m", "n", "s", "t", "y", "est", "à",
];

const DEFAULT_GERMAN_STOP_WORDS: &[&str] = &[
    "aber", "als", "am", "an", "auch", "auf", "aus", "bei", "bin", "bis", "das", "dass", "dem",
    "den", "der", "des", "die", "doch", "du", "ein", "eine", "einem", "einen", "einer", "eines",
    "er", "es", "für", "hat", "ich", "ihr", "im", "in", "ist", "ja", "kein", "mit", "nach",
    "nicht", "noch", "nur", "oder", "sein", "sich", "sie", "sind", "so", "um", "und", "uns",
    "von", "vor", "war", "was", "wie", "wir", "wird", "zu", "zum", "zur",
];

const DEFAULT_SPANISH_STOP_WORDS: &[&str] = &[
    "a", "al", "algo", "como", "con", "de", "del", "el", "ella", "ellos", "en", "es", "esta",
    "este", "esto", "fue", "ha", "la", "las", "le", "les", "lo", "los", "más", "me", "mi", "muy",
    "no", "nos", "o", "para", "pero", "por", "que", "se", "si", "sin", "sobre", "su", "sus",
    "te", "tu", "un", "una", "uno", "unos", "y", "ya", "yo",
];

const DEFAULT_PORTUGUESE_STOP_WORDS: &[&str] = &[
    "a", "ao", "aos", "as", "com", "como", "da", "das", "de", "do", "dos", "e", "ela", "ele",
    "em", "entre", "era", "foi", "há", "isso", "isto", "já", "mais", "mas", "na", "nas", "no",
    "nos", "não", "o", "os", "ou", "para", "pela", "pelo", "por", "que", "se", "sem", "seu",
    "sua", "são", "também", "um", "uma", "é",
];

fn to_set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|&s| s.to_string()).collect()
}

pub static DEFAULT_ENGLISH_STOP_WORDS_SET: LazyLock<HashSet<String>> =
    LazyLock::new(|| to_set(DEFAULT_ENGLISH_STOP_WORDS));

pub static DEFAULT_ITALIAN_STOP_WORDS_SET: LazyLock<HashSet<String>> =
    LazyLock::new(|| to_set(DEFAULT_ITALIAN_STOP_WORDS));

pub static DEFAULT_FRENCH_STOP_WORDS_SET: LazyLock<HashSet<String>> =
    LazyLock::new(|| to_set(DEFAULT_FRENCH_STOP_WORDS));

pub static DEFAULT_GERMAN_STOP_WORDS_SET: LazyLock<HashSet<String>> =
    LazyLock::new(|| to_set(DEFAULT_GERMAN_STOP_WORDS));

pub static DEFAULT_SPANISH_STOP_WORDS_SET: LazyLock<HashSet<String>> =
    LazyLock::new(|| to_set(DEFAULT_SPANISH_STOP_WORDS));

pub static DEFAULT_PORTUGUESE_STOP_WORDS_SET: LazyLock<HashSet<String>> =
    LazyLock::new(|| to_set(DEFAULT_PORTUGUESE_STOP_WORDS));

static EMPTY_STOP_WORDS_SET: LazyLock<HashSet<String>> = LazyLock::new(HashSet::new);

/// Default stop words for a language code. Unknown languages get an empty set.
pub fn default_stop_words(language: &str) -> &'static HashSet<String> {
    match language {
        "en" => &DEFAULT_ENGLISH_STOP_WORDS_SET,
        "it" => &DEFAULT_ITALIAN_STOP_WORDS_SET,
        "fr" => &DEFAULT_FRENCH_STOP_WORDS_SET,
        "de" => &DEFAULT_GERMAN_STOP_WORDS_SET,
        "es" => &DEFAULT_SPANISH_STOP_WORDS_SET,
        "pt" => &DEFAULT_PORTUGUESE_STOP_WORDS_SET,
        _ => &EMPTY_STOP_WORDS_SET,
    }
}

/// A filter that removes stop words from the token stream.
///
/// Stopped tokens can either be dropped or kept and marked, see
/// [`StopFilter::remove_stopped`].
#[derive(Clone, Debug)]
pub struct StopFilter {
    stop_words: Arc<HashSet<String>>,
    remove_stopped: bool,
}

impl StopFilter {
    /// Stop filter with the default English stop words.
    pub fn new() -> Self {
        Self::with_stop_words(DEFAULT_ENGLISH_STOP_WORDS_SET.clone())
    }

    /// Stop filter with the default stop words of `language`.
    pub fn for_language(language: &str) -> Self {
        Self::with_stop_words(default_stop_words(language).clone())
    }

    pub fn with_stop_words(stop_words: HashSet<String>) -> Self {
        StopFilter {
            stop_words: Arc::new(stop_words),
            remove_stopped: true,
        }
    }

    /// Create a new stop filter from a list of stop words.
    ///
    /// ```
    /// use taxis::analysis::token_filter::stop::StopFilter;
    ///
    /// let filter = StopFilter::from_words(vec!["foo", "bar", "baz"]);
    /// assert_eq!(filter.len(), 3);
    /// ```
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stop_words = words.into_iter().map(|s| s.into()).collect();
        Self::with_stop_words(stop_words)
    }

    /// If `false`, stop words are kept in the stream and marked as stopped.
    pub fn remove_stopped(mut self, remove: bool) -> Self {
        self.remove_stopped = remove;
        self
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    pub fn stop_words(&self) -> &HashSet<String> {
        &self.stop_words
    }

    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }
}

impl Default for StopFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for StopFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let filtered_tokens: Vec<Token> = tokens
            .filter_map(|token| {
                if token.is_stopped() {
                    Some(token)
                } else if self.is_stop_word(&token.text) {
                    if self.remove_stopped {
                        None
                    } else {
                        Some(token.stop())
                    }
                } else {
                    Some(token)
                }
            })
            .collect();

        Ok(Box::new(filtered_tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "stop"
    }
}
