//! Stored documents, one per collection.
//!
//! Each document keeps the record body as bincode bytes next to the fields
//! the store filters on, which are indexed as secondary keys.

use chrono::{DateTime, Utc};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Stored tutor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredTutor {
    #[primary_key]
    pub id: String,
    /// Authentication subject.
    #[secondary_key]
    pub uid: String,
    pub body: Vec<u8>,
}

/// Stored pet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredPet {
    #[primary_key]
    pub id: String,
    #[secondary_key]
    pub tutor_id: String,
    pub body: Vec<u8>,
}

/// Stored appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct StoredAppointment {
    #[primary_key]
    pub id: String,
    #[secondary_key]
    pub pet_id: String,
    #[secondary_key]
    pub tutor_id: String,
    /// Assigned staff member, empty when unassigned.
    #[secondary_key]
    pub staff_key: String,
    /// Start day as `YYYY-MM-DD`.
    #[secondary_key]
    pub day: String,
    pub body: Vec<u8>,
}

/// Stored invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 4, version = 1)]
#[native_db]
pub struct StoredInvoice {
    #[primary_key]
    pub id: String,
    #[secondary_key]
    pub tutor_id: String,
    #[secondary_key]
    pub status: String,
    pub body: Vec<u8>,
}

/// Stored inventory item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 5, version = 1)]
#[native_db]
pub struct StoredInventoryItem {
    #[primary_key]
    pub id: String,
    pub body: Vec<u8>,
}

/// Stored staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 6, version = 1)]
#[native_db]
pub struct StoredStaffMember {
    #[primary_key]
    pub id: String,
    /// Authentication subject, empty until the member has an account.
    #[secondary_key]
    pub uid_key: String,
    pub body: Vec<u8>,
}

/// Stored concierge handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 7, version = 1)]
#[native_db]
pub struct StoredHandoff {
    #[primary_key]
    pub id: String,
    pub body: Vec<u8>,
}

/// Stored record of a sent job email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 20, version = 1)]
#[native_db]
pub struct StoredReminder {
    /// `{kind}:{subject_id}:{period}`
    #[primary_key]
    pub key: String,
    pub sent_at: DateTime<Utc>,
}
