//! Error types for ygo_collection

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for catalog, collection and export operations
#[derive(Debug, Error)]
pub enum CollectionError {
    /// Catalog source is missing, unreadable or not valid JSON
    #[error("Catalog unavailable at {}: {reason}", path.display())]
    CatalogUnavailable { path: PathBuf, reason: String },

    /// Saved collection could not be read or does not match the expected columns
    #[error("Saved collection at {} is corrupt: {reason}", path.display())]
    SavedCollectionCorrupt { path: PathBuf, reason: String },

    /// Persisting the collection or writing an export failed
    #[error("Failed to write {}: {reason}", path.display())]
    WriteFailure { path: PathBuf, reason: String },

    /// Edit refers to a printing that is not in the catalog
    #[error("Card not in catalog: {0}")]
    UnknownCard(String),

    /// User identifier cannot be turned into a collection file name
    #[error("Invalid user name: {0:?}")]
    InvalidUser(String),

    /// Invalid runtime settings
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CollectionError {
    pub(crate) fn write_failure(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        CollectionError::WriteFailure {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CollectionError::SavedCollectionCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias for ygo_collection operations
pub type Result<T> = std::result::Result<T, CollectionError>;
