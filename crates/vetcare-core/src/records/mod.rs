//! Clinic records persisted verbatim by the document store.
//!
//! Each record has a matching `*Draft` type: the shape a portal form submits
//! before the server assigns an ID, an owner and a creation time.

mod appointment;
mod handoff;
mod inventory;
mod invoice;
mod pet;
mod staff;
mod tutor;

pub use appointment::{Appointment, AppointmentDraft, AppointmentStatus};
pub use handoff::{Handoff, Urgency};
pub use inventory::{InventoryCategory, InventoryDraft, InventoryItem};
pub use invoice::{Invoice, InvoiceDraft, InvoiceLine, InvoiceStatus};
pub use pet::{HistoryEntry, HistoryKind, Pet, PetDraft, Sex, Species};
pub use staff::{Shift, StaffDraft, StaffMember, StaffRole};
pub use tutor::{Tutor, TutorDraft};
