use thiserror::Error;

/// Main error type for docrag
#[derive(Error, Debug)]
pub enum DocragError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document conversion errors (aggregate batch failures)
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Embedding API errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector dimension disagreement between model, store and query.
    /// Always fatal; never downgraded to truncation.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Another process holds the rebuild claim
    #[error("Rebuild already in progress (claim held by another process)")]
    RebuildInProgress,
}

/// Convenient Result type using DocragError
pub type Result<T> = std::result::Result<T, DocragError>;
