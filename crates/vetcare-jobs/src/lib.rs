//! VetCare+ Jobs - Background work that sends transactional email
//!
//! - Daily reminder scan over every pet (vaccinations due, yearly checkups)
//! - Payment follow-up driven by invoice change events
//!
//! Every email sent is recorded in the store's reminder log, so reruns and
//! replayed events never send twice.

mod error;
mod followup;
mod mail;
mod reminders;
mod scheduler;
mod templates;

pub use error::{Error, Result};
pub use followup::{followup_key, handle_invoice_change, InvoiceWatcher};
pub use mail::{BoxFuture, Email, LogMailer, Mailer, MemoryMailer, ResendConfig, ResendMailer};
pub use reminders::{
    due_reminders, run_reminder_scan, Reminder, ScanReport, CHECKUP_INTERVAL_DAYS,
    VACCINATION_LEAD_DAYS,
};
pub use scheduler::{next_run_after, spawn_daily_reminders};
pub use templates::{checkup_reminder, payment_followup, vaccination_reminder, ClinicInfo};
