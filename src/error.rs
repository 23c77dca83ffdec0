//! Error types for the Annex library.
//!
//! All fallible operations return [`AnnexError`] through the crate-wide
//! [`Result`] alias. Configuration errors come from the index factory,
//! engine errors (dimension mismatches, unknown keys) come from the HNSW
//! engine and travel through the index adapters unchanged.
//!
//! # Examples
//!
//! ```
//! use annex::error::{AnnexError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(AnnexError::config("unknown index type: euclidean"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Annex operations.
#[derive(Error, Debug)]
pub enum AnnexError {
    /// I/O errors (dataset files, config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid index configuration (unknown index type, insert or remove method)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A vector does not match the dimensionality fixed by the index
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Key is not present in the index
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Vector is empty or contains NaN/infinite values
    #[error("Invalid vector: {0}")]
    InvalidVector(String),

    /// Malformed dataset input
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type alias for operations that may fail with AnnexError.
pub type Result<T> = std::result::Result<T, AnnexError>;

impl AnnexError {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        AnnexError::Config(msg.into())
    }

    /// Create a new key-not-found error.
    pub fn key_not_found<S: Into<String>>(key: S) -> Self {
        AnnexError::KeyNotFound(key.into())
    }

    /// Create a new invalid vector error.
    pub fn invalid_vector<S: Into<String>>(msg: S) -> Self {
        AnnexError::InvalidVector(msg.into())
    }

    /// Create a new dataset error.
    pub fn dataset<S: Into<String>>(msg: S) -> Self {
        AnnexError::Dataset(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        AnnexError::InvalidOperation(msg.into())
    }

    /// Whether this error came from validating index configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, AnnexError::Config(_))
    }
}
