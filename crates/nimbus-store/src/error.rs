//! Error types for nimbus-store.

use std::path::PathBuf;

/// Result type for nimbus-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in nimbus-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Document key that the store does not manage.
    #[error("Unknown document key: {0}")]
    UnknownKey(String),

    /// Database created by a newer build than this one.
    #[error("Database schema version {version} is newer than supported version {supported}")]
    UnsupportedSchema { version: i32, supported: i32 },

    /// Document written by a newer schema than this build understands.
    #[error("Document {key} has version {version}, newer than supported version {supported}")]
    UnsupportedVersion {
        key: String,
        version: i64,
        supported: i64,
    },

    /// A stored document could not be migrated to the current shape.
    #[error("Failed to migrate document {key}: {message}")]
    Migration { key: String, message: String },

    /// Invalid timestamp.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
