//! Error types for the client API.

use mpd_proto::{Ack, ProtoError};
use thiserror::Error;

/// Failures surfaced by [`crate::Client`] operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport, protocol, or `ACK` failure from the connection layer.
    #[error(transparent)]
    Proto(#[from] ProtoError),

    /// The server's first line did not announce an MPD instance.
    #[error("no greeting: {0:?}")]
    Greeting(String),

    /// A client-side precondition failed; no bytes were sent and the
    /// connection is unaffected.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// `value()` was called on a promise whose command list has not
    /// completed.
    #[error("promise has not been computed yet")]
    PendingPromise,
}

impl ApiError {
    /// The server's `ACK` payload, when this error is a server rejection.
    pub fn ack(&self) -> Option<&Ack> {
        match self {
            ApiError::Proto(ProtoError::Ack(ack)) => Some(ack),
            _ => None,
        }
    }

    /// True when the connection is gone and no further commands can
    /// succeed on it.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ApiError::Proto(proto) if proto.is_disconnect())
    }
}

/// Convenience alias for results using [`ApiError`].
pub type Result<T> = std::result::Result<T, ApiError>;
