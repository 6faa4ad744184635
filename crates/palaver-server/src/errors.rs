//! Server error types.

use thiserror::Error;

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding the listener or reading its address failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The database could not be opened.
    #[error(transparent)]
    Store(#[from] palaver_store::StoreError),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
