//! Document identifiers and collection names

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generate a fresh document ID
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Collections held by the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Tutors,
    Pets,
    Appointments,
    Invoices,
    Inventory,
    Staff,
    Handoffs,
}

impl Collection {
    /// Collection name as used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Tutors => "tutors",
            Collection::Pets => "pets",
            Collection::Appointments => "appointments",
            Collection::Invoices => "invoices",
            Collection::Inventory => "inventory",
            Collection::Staff => "staff",
            Collection::Handoffs => "handoffs",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
