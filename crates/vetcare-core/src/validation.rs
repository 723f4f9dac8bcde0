//! Presence and format checks mirroring the portal forms.
//!
//! Every check runs; the caller gets the full list of failing fields rather
//! than the first one.

use crate::error::{Error, FieldError, Result};
use crate::records::{
    AppointmentDraft, InventoryDraft, InvoiceDraft, PetDraft, Shift, StaffDraft, TutorDraft,
};
use chrono::{NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

const MAX_NAME_LEN: usize = 120;

/// Largest quantity on one invoice line
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// Largest unit price on one invoice line, in cents
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$").expect("email pattern compiles")
});

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-() ]{7,20}$").expect("phone pattern compiles"));

/// Form validation
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Collects field errors across a whole form
#[derive(Debug, Default)]
pub struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, field: &str, message: &str) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.fail(field, message);
        }
    }

    pub fn name(&mut self, field: &str, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.fail(field, "is required");
        } else if trimmed.chars().count() > MAX_NAME_LEN {
            self.fail(field, "is too long");
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        self.check(
            EMAIL.is_match(value.trim()),
            field,
            "is not a valid email address",
        );
    }

    pub fn phone(&mut self, field: &str, value: &str) {
        self.check(
            PHONE.is_match(value.trim()),
            field,
            "is not a valid phone number",
        );
    }

    pub fn not_future(&mut self, field: &str, value: Option<NaiveDate>) {
        if let Some(date) = value {
            self.check(
                date <= Utc::now().date_naive(),
                field,
                "cannot be in the future",
            );
        }
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self.errors))
        }
    }
}

impl Validate for TutorDraft {
    fn validate(&self) -> Result<()> {
        let mut c = Checker::new();
        c.name("name", &self.name);
        c.email("email", &self.email);
        c.phone("phone", &self.phone);
        c.finish()
    }
}

impl Validate for PetDraft {
    fn validate(&self) -> Result<()> {
        let mut c = Checker::new();
        c.name("name", &self.name);
        c.not_future("birth_date", self.birth_date);
        if let Some(weight) = self.weight_kg {
            c.check(
                weight > 0.0 && weight.is_finite(),
                "weight_kg",
                "must be greater than zero",
            );
        }
        for allergy in &self.allergies {
            if allergy.trim().is_empty() {
                c.fail("allergies", "cannot contain blank entries");
                break;
            }
        }
        c.finish()
    }
}

impl Validate for AppointmentDraft {
    fn validate(&self) -> Result<()> {
        let mut c = Checker::new();
        c.check(!self.pet_id.trim().is_empty(), "pet_id", "is required");
        c.check(
            (5..=480).contains(&self.duration_minutes),
            "duration_minutes",
            "must be between 5 and 480",
        );
        c.check(!self.reason.trim().is_empty(), "reason", "is required");
        c.finish()
    }
}

impl Validate for InvoiceDraft {
    fn validate(&self) -> Result<()> {
        let mut c = Checker::new();
        c.check(!self.tutor_id.trim().is_empty(), "tutor_id", "is required");
        c.check(!self.lines.is_empty(), "lines", "needs at least one line");
        for (i, line) in self.lines.iter().enumerate() {
            if line.description.trim().is_empty() {
                c.fail(&format!("lines[{i}].description"), "is required");
            }
            if line.quantity == 0 {
                c.fail(&format!("lines[{i}].quantity"), "must be greater than zero");
            } else if line.quantity > MAX_LINE_QUANTITY {
                c.fail(&format!("lines[{i}].quantity"), "is too large");
            }
            if line.unit_price_cents < 0 {
                c.fail(&format!("lines[{i}].unit_price_cents"), "cannot be negative");
            } else if line.unit_price_cents > MAX_UNIT_PRICE_CENTS {
                c.fail(&format!("lines[{i}].unit_price_cents"), "is too large");
            }
        }
        c.finish()
    }
}

impl Validate for InventoryDraft {
    fn validate(&self) -> Result<()> {
        let mut c = Checker::new();
        c.name("name", &self.name);
        c.check(!self.sku.trim().is_empty(), "sku", "is required");
        c.check(!self.unit.trim().is_empty(), "unit", "is required");
        c.check(
            self.unit_cost_cents >= 0,
            "unit_cost_cents",
            "cannot be negative",
        );
        c.finish()
    }
}

impl Validate for StaffDraft {
    fn validate(&self) -> Result<()> {
        let mut c = Checker::new();
        c.name("name", &self.name);
        c.email("email", &self.email);
        for (i, shift) in self.shifts.iter().enumerate() {
            check_shift(&mut c, i, shift);
        }
        c.finish()
    }
}

fn check_shift(c: &mut Checker, index: usize, shift: &Shift) {
    c.check(
        shift.start < shift.end,
        &format!("shifts[{index}]"),
        "must start before it ends",
    );
}
