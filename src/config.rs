//! Engine configuration.
//!
//! Configuration is plain serde data so it can be read from a JSON file or
//! built in code with the builder-style setters.
//!
//! ```
//! use taxis::config::EngineConfig;
//!
//! let config = EngineConfig::default().with_languages(["en"]).with_k(3);
//! assert_eq!(config.languages, vec!["en".to_string()]);
//! assert_eq!(config.k, 3);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaxisError};

/// Languages handled when no explicit list is configured.
pub const DEFAULT_LANGUAGES: &[&str] = &["it", "en", "fr", "de", "es", "pt"];

fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()
}

fn default_k() -> usize {
    1
}

fn default_threshold() -> f64 {
    0.5
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_commit_interval() -> usize {
    100
}

fn default_table_delimiter() -> char {
    '\t'
}

/// Configuration for a [`MulticlassEngine`](crate::engine::MulticlassEngine)
/// and the index operations it drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Languages with their own index directory under the structure root.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Neighbour count for the KNN classifier of newly created nodes.
    #[serde(default = "default_k")]
    pub k: usize,

    /// Default confidence threshold for cascading classification.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Worker count for batch classification.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Number of rows written between intermediate commits during bulk builds.
    #[serde(default = "default_commit_interval")]
    pub commit_interval: usize,

    /// Optional regex used instead of Unicode word segmentation.
    #[serde(default)]
    pub token_pattern: Option<String>,

    /// Column delimiter of tabular training files.
    #[serde(default = "default_table_delimiter")]
    pub table_delimiter: char,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            languages: default_languages(),
            k: default_k(),
            threshold: default_threshold(),
            workers: default_workers(),
            commit_interval: default_commit_interval(),
            token_pattern: None,
            table_delimiter: default_table_delimiter(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            return Err(TaxisError::config("at least one language is required"));
        }
        if self.k == 0 {
            return Err(TaxisError::config("k must be at least 1"));
        }
        if self.workers == 0 {
            return Err(TaxisError::config("workers must be at least 1"));
        }
        if self.commit_interval == 0 {
            return Err(TaxisError::config("commit_interval must be at least 1"));
        }
        if !self.table_delimiter.is_ascii() {
            return Err(TaxisError::config("table_delimiter must be an ASCII character"));
        }
        Ok(())
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_token_pattern<S: Into<String>>(mut self, pattern: S) -> Self {
        self.token_pattern = Some(pattern.into());
        self
    }

    /// Whether `language` is one of the configured languages.
    pub fn supports(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.k, 1);
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.commit_interval, 100);
        assert_eq!(config.table_delimiter, '\t');
        assert!(config.supports("it"));
        assert!(config.supports("en"));
        assert!(!config.supports("xx"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("taxis.json");
        std::fs::write(&path, r#"{"languages": ["en"], "k": 5}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.languages, vec!["en".to_string()]);
        assert_eq!(config.k, 5);
        assert_eq!(config.threshold, 0.5);
    }

    #[test]
    fn test_validate_rejects_zero_k() {
        let config = EngineConfig::default().with_k(0);
        assert!(config.validate().is_err());
    }
}
