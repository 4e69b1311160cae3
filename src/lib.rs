//! # Fraudstore - Transaction Dataset Storage
//!
//! Local storage layer for an exploratory fraud-analysis workflow.
//!
//! Fraudstore provides:
//! - A fixed project directory tree for raw, processed, feature and prediction data
//! - CSV ingestion into an immutable raw copy plus a SQLite table
//! - Content hashing and an append-only JSON registry of ingest events
//! - Typed canned queries over the transactions table
//! - Processed-stage checkpoints and database summaries

pub mod table;
pub mod hash;
pub mod config;
pub mod storage;
pub mod registry;
pub mod query;
pub mod manager;
pub mod ui;
pub mod output;

// Re-exports for convenient access
pub use table::{Table, Value};
pub use hash::{ContentHasher, Blake3Hasher, DataHash};
pub use config::{StorageConfig, ProjectLayout};
pub use storage::SqliteStore;
pub use registry::{HashChange, MetadataRegistry, RegistryEntry};
pub use query::{TransactionQuery, ClassStatistics, TransactionCounts};
pub use manager::{StorageManager, LoadOutcome, MetadataStatus, DataSummary, TableSummary};

/// Result type alias for Fraudstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Fraudstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Query failed: {source}\nQuery: {sql}")]
    Query {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Coarse failure categories callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Query,
    Io,
    Unexpected,
}

impl Error {
    /// Classify this error into the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Csv(e) if e.is_io_error() => ErrorKind::Io,
            Error::Validation(_) | Error::Csv(_) => ErrorKind::Validation,
            Error::Query { .. } | Error::Storage(_) => ErrorKind::Query,
            Error::Io(_) => ErrorKind::Io,
            Error::Serialization(_) | Error::Unexpected(_) => ErrorKind::Unexpected,
        }
    }
}
