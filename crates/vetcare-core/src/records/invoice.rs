use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Pending,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Draft → Pending | Cancelled, Pending → Paid | Cancelled
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Draft, InvoiceStatus::Pending)
                | (InvoiceStatus::Draft, InvoiceStatus::Cancelled)
                | (InvoiceStatus::Pending, InvoiceStatus::Paid)
                | (InvoiceStatus::Pending, InvoiceStatus::Cancelled)
        )
    }
}

/// A billed line; lines tied to an inventory item consume stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    #[serde(default)]
    pub inventory_item_id: Option<String>,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

impl InvoiceLine {
    pub fn amount_cents(&self) -> i64 {
        i64::from(self.quantity).saturating_mul(self.unit_price_cents)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub tutor_id: String,
    pub appointment_id: Option<String>,
    pub lines: Vec<InvoiceLine>,
    pub status: InvoiceStatus,
    pub issued_on: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn total_cents(&self) -> i64 {
        self.lines
            .iter()
            .map(InvoiceLine::amount_cents)
            .fold(0, i64::saturating_add)
    }

    /// Stock consumed by this invoice, one entry per inventory line
    pub fn stock_usage(&self) -> Vec<(String, u32)> {
        self.lines
            .iter()
            .filter_map(|line| {
                line.inventory_item_id
                    .as_ref()
                    .map(|id| (id.clone(), line.quantity))
            })
            .collect()
    }

    /// Move to `next`, stamping `paid_at` when it becomes paid
    pub fn transition(&mut self, next: InvoiceStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::Conflict(format!(
                "invoice {} cannot move from {} to {}",
                self.id,
                self.status.as_str(),
                next.as_str()
            )));
        }
        self.status = next;
        if next == InvoiceStatus::Paid {
            self.paid_at = Some(now);
        }
        Ok(())
    }
}

/// Billing form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub tutor_id: String,
    #[serde(default)]
    pub appointment_id: Option<String>,
    pub lines: Vec<InvoiceLine>,
    #[serde(default)]
    pub issued_on: Option<NaiveDate>,
}

impl InvoiceDraft {
    pub fn into_invoice(self, id: String, now: DateTime<Utc>) -> Invoice {
        Invoice {
            id,
            tutor_id: self.tutor_id,
            appointment_id: self.appointment_id,
            lines: self.lines,
            status: InvoiceStatus::Draft,
            issued_on: self.issued_on.unwrap_or_else(|| now.date_naive()),
            paid_at: None,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice() -> Invoice {
        InvoiceDraft {
            tutor_id: "t1".to_string(),
            appointment_id: None,
            lines: vec![
                InvoiceLine {
                    description: "Consultation".to_string(),
                    inventory_item_id: None,
                    quantity: 1,
                    unit_price_cents: 15_000,
                },
                InvoiceLine {
                    description: "Rabies vaccine".to_string(),
                    inventory_item_id: Some("vac-1".to_string()),
                    quantity: 2,
                    unit_price_cents: 4_500,
                },
            ],
            issued_on: None,
        }
        .into_invoice("i1".into(), Utc::now())
    }

    #[test]
    fn test_total_and_stock_usage() {
        let invoice = invoice();
        assert_eq!(invoice.total_cents(), 24_000);
        assert_eq!(invoice.stock_usage(), vec![("vac-1".to_string(), 2)]);
    }

    #[test]
    fn test_total_saturates_instead_of_overflowing() {
        let mut invoice = invoice();
        invoice.lines[0].quantity = 3;
        invoice.lines[0].unit_price_cents = i64::MAX / 2;
        assert_eq!(invoice.lines[0].amount_cents(), i64::MAX);
        assert_eq!(invoice.total_cents(), i64::MAX);
    }

    #[test]
    fn test_paid_stamps_time() {
        let mut invoice = invoice();
        let now = Utc::now();
        invoice.transition(InvoiceStatus::Pending, now).unwrap();
        assert!(invoice.paid_at.is_none());
        invoice.transition(InvoiceStatus::Paid, now).unwrap();
        assert_eq!(invoice.paid_at, Some(now));
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let mut invoice = invoice();
        let now = Utc::now();
        assert!(matches!(
            invoice.transition(InvoiceStatus::Paid, now),
            Err(Error::Conflict(_))
        ));
        invoice.transition(InvoiceStatus::Cancelled, now).unwrap();
        assert!(invoice.transition(InvoiceStatus::Pending, now).is_err());
        assert_eq!(invoice.status, InvoiceStatus::Cancelled);
    }
}
