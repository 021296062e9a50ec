//! Error types for the docgate-store crate.
//!
//! All storage operations return [`StoreError`] via [`StoreResult`].

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A schema migration failed.
    #[error("migration v{version} failed: {message}")]
    Migration { version: u32, message: String },

    /// The collection name is not usable.
    #[error("invalid collection name `{name}`: {reason}")]
    InvalidCollection { name: String, reason: &'static str },

    /// A query filter could not be evaluated.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// An update document could not be applied.
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// A document with the same `_id` already exists in the collection.
    #[error("duplicate key: _id `{id}` already exists in `{collection}`")]
    DuplicateKey { collection: String, id: String },

    /// An invalid argument was provided to a store operation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A blocking task was cancelled or panicked.
    #[error("background task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskJoin(err.to_string())
    }
}
