//! VetCare+ Core - Clinic records and form validation
//!
//! This crate provides the plain records every other VetCare+ crate passes
//! around:
//! - Tutors (pet owners) and their pets with medical history
//! - Appointments, invoices, inventory items and staff members
//! - Concierge handoffs raised by the chat assistant
//! - Presence/format validation mirroring the portal forms
//!
//! Records reference each other by string ID only. Resolving a reference is
//! the store's job; nothing here enforces referential integrity.

mod error;
mod identity;
pub mod records;
pub mod validation;

pub use error::{Error, FieldError, Result};
pub use identity::{new_id, Collection};
pub use records::{
    Appointment, AppointmentDraft, AppointmentStatus, Handoff, HistoryEntry, HistoryKind,
    InventoryCategory, InventoryDraft, InventoryItem, Invoice, InvoiceDraft, InvoiceLine,
    InvoiceStatus, Pet, PetDraft, Sex, Shift, Species, StaffDraft, StaffMember, StaffRole, Tutor,
    TutorDraft, Urgency,
};
pub use validation::Validate;
