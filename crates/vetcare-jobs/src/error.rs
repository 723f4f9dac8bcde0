//! Error types for background jobs

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The email provider rejected the message
    #[error("mail provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("store error: {0}")]
    Store(#[from] vetcare_db::Error),

    /// A record the job needs is missing or unusable
    #[error("{0}")]
    Skipped(String),
}

pub type Result<T> = std::result::Result<T, Error>;
