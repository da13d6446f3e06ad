//! Error types for the Taxis library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`TaxisError`] enum. Variants follow the failure taxonomy of the engine:
//! index and storage I/O failures, structural conflicts in the category tree,
//! serialization problems with the structure file, and cancelled batch work.
//!
//! # Examples
//!
//! ```
//! use taxis::error::{TaxisError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(TaxisError::invalid_argument("Invalid input"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Taxis operations.
#[derive(Error, Debug)]
pub enum TaxisError {
    /// I/O errors (file operations, directory listing, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index-related errors (corrupt segments, bad manifests, commit failures)
    #[error("Index error: {0}")]
    Index(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Analysis-related errors (tokenization, filtering, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Classifier training or prediction errors
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Structural errors in the category tree
    #[error("Tree error: {0}")]
    Tree(String),

    /// A sibling with the same name already exists
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    /// A node referenced by path does not exist
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Structure file errors
    #[error("XML error: {0}")]
    Xml(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation cancelled
    #[error("Operation cancelled: {0}")]
    OperationCancelled(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Delimited text errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Binary encoding errors
    #[error("Encoding error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with TaxisError.
pub type Result<T> = std::result::Result<T, TaxisError>;

impl TaxisError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        TaxisError::Index(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        TaxisError::Storage(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        TaxisError::Analysis(msg.into())
    }

    /// Create a new classifier error.
    pub fn classifier<S: Into<String>>(msg: S) -> Self {
        TaxisError::Classifier(msg.into())
    }

    /// Create a new tree error.
    pub fn tree<S: Into<String>>(msg: S) -> Self {
        TaxisError::Tree(msg.into())
    }

    /// Create a new duplicate node error.
    pub fn duplicate_node<S: Into<String>>(name: S) -> Self {
        TaxisError::DuplicateNode(name.into())
    }

    /// Create a new node not found error.
    pub fn node_not_found<S: Into<String>>(name: S) -> Self {
        TaxisError::NodeNotFound(name.into())
    }

    /// Create a new serialization error.
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        TaxisError::Serialization(msg.into())
    }

    /// Create a new XML error.
    pub fn xml<S: Into<String>>(msg: S) -> Self {
        TaxisError::Xml(msg.into())
    }

    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        TaxisError::Config(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        TaxisError::Other(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        TaxisError::Other(format!("Invalid argument: {}", msg.into()))
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        TaxisError::Other(format!("Internal error: {}", msg.into()))
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        TaxisError::OperationCancelled(msg.into())
    }
}
