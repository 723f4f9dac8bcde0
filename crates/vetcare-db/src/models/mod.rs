//! Database models for persistent storage.

mod document;
mod records;

pub(crate) use document::day_key;
pub use document::Document;
pub use records::*;
