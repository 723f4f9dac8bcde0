//! Error types for database operations.

use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Native DB error.
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Record-level failure (missing document, stock shortfall, ...).
    #[error(transparent)]
    Core(#[from] vetcare_core::Error),
}

impl Error {
    /// The wrapped record-level error, if any.
    pub fn as_core(&self) -> Option<&vetcare_core::Error> {
        match self {
            Error::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        Error::Database(err.to_string())
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;
