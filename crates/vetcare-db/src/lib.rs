//! VetCare+ DB - Document store using native_db
//!
//! Provides persistent storage for:
//! - Tutors, pets, appointments, invoices, inventory and staff
//! - Concierge handoffs
//! - The log of emails already sent by background jobs
//!
//! Atomic multi-document writes (stock deduction) and change feeds are the
//! database's own transaction and watch primitives.

mod error;
mod models;
mod queries;
mod store;
mod subscribe;

pub use error::{Error, Result};
pub use models::Document;
pub use store::Store;
pub use subscribe::{Change, Next, Subscription};
