//! Store error types.

use palaver_core::GatewayError;

/// Errors raised by the SQLite store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite returned an error.
    #[error("database error: {0}")]
    Database(String),

    /// A schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness or relational constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be decoded.
    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        /// Table name.
        table: &'static str,
        /// Column name.
        column: &'static str,
        /// Decoder message.
        detail: String,
    },

    /// Filesystem error while preparing the database location.
    #[error("IO error: {0}")]
    Io(String),

    /// The blocking worker running the query was cancelled or panicked.
    #[error("worker failed: {0}")]
    Worker(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(inner, _)
                if inner.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(e.to_string())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Worker(e.to_string())
    }
}

impl From<StoreError> for GatewayError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => GatewayError::NotFound(what),
            StoreError::Conflict(why) => GatewayError::Rejected(why),
            other => GatewayError::Unavailable(other.to_string()),
        }
    }
}
