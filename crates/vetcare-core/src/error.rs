//! Error types for vetcare-core

use crate::identity::Collection;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single failing form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Core error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldError>),

    #[error("{collection} not found: {id}")]
    NotFound { collection: Collection, id: String },

    #[error("Forbidden")]
    Forbidden,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock for {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: String,
        requested: u32,
        available: u32,
    },
}

impl Error {
    /// Shorthand for a `NotFound` error
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        Error::NotFound {
            collection,
            id: id.into(),
        }
    }

    /// Field errors carried by a validation failure
    pub fn fields(&self) -> Option<&[FieldError]> {
        match self {
            Error::Validation(fields) => Some(fields),
            _ => None,
        }
    }
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
