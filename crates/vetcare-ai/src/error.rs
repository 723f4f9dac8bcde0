//! Error types for model calls and flows

use thiserror::Error;

/// Errors raised by the generative-model flows
#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure talking to the provider
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// The model produced no usable candidate
    #[error("model returned an empty response")]
    EmptyResponse,

    /// The model output did not match the requested shape
    #[error("malformed model output: {0}")]
    MalformedOutput(String),

    /// Invalid flow input
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Persisting a tool side effect failed
    #[error("store error: {0}")]
    Store(#[from] vetcare_db::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
