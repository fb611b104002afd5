//! Error types for nimbus-worker.

use thiserror::Error;

use crate::lifecycle::WorkerState;

/// Errors raised by the cache worker.
///
/// Cache strategies never fail: they degrade to a cached copy or a
/// synthesized response. Errors surface from the network seam, from
/// lifecycle misuse and from requests that bypass the strategies.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport failure.
    #[cfg(feature = "http")]
    #[error("Network request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Network failure from a non-HTTP backend.
    #[error("Network unavailable: {0}")]
    Network(String),

    /// A URL that cannot be resolved against the worker origin.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A lifecycle step taken out of order.
    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition { from: WorkerState, to: WorkerState },

    /// Malformed client message.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }
}

/// Result type alias using nimbus-worker's Error type.
pub type Result<T> = std::result::Result<T, Error>;
