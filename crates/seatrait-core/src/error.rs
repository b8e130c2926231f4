//! Error types for seatrait.

use thiserror::Error;

/// Result type alias using seatrait's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for seatrait operations.
///
/// Only storage unavailability is expected to reach callers of the query
/// surface; every other condition is logged and degraded to an empty result
/// by the repositories themselves.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Tabular trait source could not be read
    #[error("Source error: {0}")]
    Source(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
