//! Per-language analyzer cache and stop word files.
//!
//! The registry builds a [`LanguageAnalyzer`] the first time a language is
//! requested, reading the custom stop word file `stop_<language>.txt` from
//! its stop word directory, and serves the cached instance afterwards.
//! Storing a new stop word list rewrites the file and swaps the cached
//! analyzer.

use std::collections::BTreeSet;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, info};
use parking_lot::RwLock;

use crate::analysis::analyzer::language::LanguageAnalyzer;
use crate::error::Result;

/// File name of the custom stop word list of `language`.
pub fn stop_word_file_name(language: &str) -> String {
    format!("stop_{language}.txt")
}

/// Read a stop word file: one word per line, leading whitespace and anything
/// after the word are ignored, blank lines are skipped.
pub fn read_stop_words<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let file = fs::File::open(path.as_ref())?;
    let mut words = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if let Some(word) = line.split_whitespace().next() {
            words.push(word.to_string());
        }
    }
    Ok(words)
}

/// Write a stop word file, one word per line, sorted and deduplicated.
pub fn write_stop_words<P: AsRef<Path>, S: AsRef<str>>(path: P, words: &[S]) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    let unique: BTreeSet<&str> = words
        .iter()
        .map(|w| w.as_ref().trim())
        .filter(|w| !w.is_empty())
        .collect();

    let mut writer = BufWriter::new(fs::File::create(path.as_ref())?);
    for word in unique {
        writeln!(writer, "{word}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Lazily built analyzers, one per language.
#[derive(Debug)]
pub struct AnalyzerRegistry {
    stop_word_dir: PathBuf,
    token_pattern: Option<String>,
    analyzers: RwLock<AHashMap<String, Arc<LanguageAnalyzer>>>,
}

impl AnalyzerRegistry {
    pub fn new<P: Into<PathBuf>>(stop_word_dir: P) -> Self {
        AnalyzerRegistry {
            stop_word_dir: stop_word_dir.into(),
            token_pattern: None,
            analyzers: RwLock::new(AHashMap::new()),
        }
    }

    pub fn with_token_pattern(mut self, pattern: Option<String>) -> Self {
        self.token_pattern = pattern;
        self
    }

    pub fn stop_word_dir(&self) -> &Path {
        &self.stop_word_dir
    }

    pub fn stop_word_path(&self, language: &str) -> PathBuf {
        self.stop_word_dir.join(stop_word_file_name(language))
    }

    /// The analyzer of `language`, built on first use.
    pub fn get(&self, language: &str) -> Result<Arc<LanguageAnalyzer>> {
        if let Some(analyzer) = self.analyzers.read().get(language) {
            return Ok(Arc::clone(analyzer));
        }

        let analyzer = Arc::new(self.build(language)?);
        let mut analyzers = self.analyzers.write();
        let entry = analyzers
            .entry(language.to_string())
            .or_insert_with(|| Arc::clone(&analyzer));
        Ok(Arc::clone(entry))
    }

    /// Persist `words` as the custom stop words of `language` and replace the
    /// cached analyzer with one built from them.
    pub fn store_stop_words<S: AsRef<str>>(
        &self,
        language: &str,
        words: &[S],
    ) -> Result<Arc<LanguageAnalyzer>> {
        let path = self.stop_word_path(language);
        write_stop_words(&path, words)?;
        info!("Stored {} stop words for {language} in {path:?}", words.len());

        let analyzer = Arc::new(self.build(language)?);
        self.analyzers
            .write()
            .insert(language.to_string(), Arc::clone(&analyzer));
        Ok(analyzer)
    }

    /// Drop every cached analyzer.
    pub fn clear(&self) {
        self.analyzers.write().clear();
    }

    fn build(&self, language: &str) -> Result<LanguageAnalyzer> {
        let path = self.stop_word_path(language);
        let custom = if path.exists() {
            read_stop_words(&path)?
        } else {
            Vec::new()
        };
        debug!(
            "Building analyzer for {language} with {} custom stop words",
            custom.len()
        );
        LanguageAnalyzer::new(language, custom, self.token_pattern.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_stop_words_drops_trailing_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stop.txt");
        fs::write(&path, "alpha\nbeta  comment here\n\n  gamma \n").unwrap();

        let words = read_stop_words(&path).unwrap();
        assert_eq!(words, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_read_stop_words_with_leading_whitespace() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stop.txt");
        fs::write(&path, "  gamma \n\tdelta\n \t \n").unwrap();

        let words = read_stop_words(&path).unwrap();
        assert_eq!(words, vec!["gamma", "delta"]);
    }

    #[test]
    fn test_registry_caches_and_swaps() {
        let dir = TempDir::new().unwrap();
        let registry = AnalyzerRegistry::new(dir.path());

        let first = registry.get("en").unwrap();
        let second = registry.get("en").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.tokenize_to_string("red widget").unwrap(), "red widget");

        let updated = registry.store_stop_words("en", &["widget"]).unwrap();
        assert!(!Arc::ptr_eq(&first, &updated));
        assert_eq!(updated.tokenize_to_string("red widget").unwrap(), "red");
        assert!(registry.stop_word_path("en").exists());

        // A fresh registry reads the stored file.
        let reopened = AnalyzerRegistry::new(dir.path());
        assert_eq!(
            reopened.get("en").unwrap().tokenize_to_string("red widget").unwrap(),
            "red"
        );
    }
}
