//! Error types for the fake server.

use thiserror::Error;

/// Failures starting or running the fake server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or accepting on the listener socket failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The provided configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias for results using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;
