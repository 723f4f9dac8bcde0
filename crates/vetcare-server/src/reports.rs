//! Clinic summary report

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use vetcare_core::{Appointment, AppointmentStatus, Invoice, InvoiceStatus, Pet};
use vetcare_db::Store;

/// Totals over an inclusive date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Paid invoices issued in the range
    pub revenue_paid_cents: i64,
    /// Pending invoices issued in the range
    pub outstanding_cents: i64,
    pub invoices_by_status: IndexMap<String, usize>,
    pub appointments_by_status: IndexMap<String, usize>,
    /// Pets registered in the range
    pub new_patients: usize,
    /// Items currently at or below their reorder level
    pub low_stock_items: usize,
}

pub fn summarize(store: &Store, from: NaiveDate, to: NaiveDate) -> vetcare_db::Result<ReportSummary> {
    let in_range = |day: NaiveDate| from <= day && day <= to;

    let mut invoices_by_status: IndexMap<String, usize> = InvoiceStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    let mut revenue_paid_cents: i64 = 0;
    let mut outstanding_cents: i64 = 0;
    for invoice in store.all::<Invoice>()? {
        if !in_range(invoice.issued_on) {
            continue;
        }
        *invoices_by_status
            .entry(invoice.status.as_str().to_string())
            .or_default() += 1;
        match invoice.status {
            InvoiceStatus::Paid => {
                revenue_paid_cents = revenue_paid_cents.saturating_add(invoice.total_cents())
            }
            InvoiceStatus::Pending => {
                outstanding_cents = outstanding_cents.saturating_add(invoice.total_cents())
            }
            InvoiceStatus::Draft | InvoiceStatus::Cancelled => {}
        }
    }

    let mut appointments_by_status: IndexMap<String, usize> = AppointmentStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for appointment in store.all::<Appointment>()? {
        if in_range(appointment.day()) {
            *appointments_by_status
                .entry(appointment.status.as_str().to_string())
                .or_default() += 1;
        }
    }

    let new_patients = store
        .all::<Pet>()?
        .iter()
        .filter(|p| in_range(p.created_at.date_naive()))
        .count();

    Ok(ReportSummary {
        from,
        to,
        revenue_paid_cents,
        outstanding_cents,
        invoices_by_status,
        appointments_by_status,
        new_patients,
        low_stock_items: store.low_stock()?.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vetcare_core::{
        AppointmentDraft, InventoryCategory, InventoryDraft, InvoiceDraft, InvoiceLine, PetDraft,
        Species,
    };

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn invoice(id: &str, day: u32, cents: i64, status: InvoiceStatus) -> Invoice {
        let mut invoice = InvoiceDraft {
            tutor_id: "t1".to_string(),
            appointment_id: None,
            lines: vec![InvoiceLine {
                description: "Visit".to_string(),
                inventory_item_id: None,
                quantity: 1,
                unit_price_cents: cents,
            }],
            issued_on: Some(date(day)),
        }
        .into_invoice(id.to_string(), Utc::now());
        invoice.status = status;
        invoice
    }

    #[test]
    fn test_summary_counts_range() {
        let store = Store::in_memory().unwrap();
        store.insert(&invoice("i1", 3, 5_000, InvoiceStatus::Paid)).unwrap();
        store.insert(&invoice("i2", 4, 2_500, InvoiceStatus::Pending)).unwrap();
        store.insert(&invoice("i3", 5, 9_999, InvoiceStatus::Draft)).unwrap();
        store.insert(&invoice("i4", 20, 7_000, InvoiceStatus::Paid)).unwrap();

        let appointment = AppointmentDraft {
            pet_id: "p1".to_string(),
            staff_id: None,
            starts_at: Utc.with_ymd_and_hms(2024, 6, 4, 10, 0, 0).unwrap(),
            duration_minutes: 30,
            reason: "Checkup".to_string(),
            notes: None,
        }
        .into_appointment("a1".to_string(), "t1".to_string(), Utc::now());
        store.insert(&appointment).unwrap();

        let pet = PetDraft {
            name: "Luna".to_string(),
            species: Species::Cat,
            breed: None,
            sex: Default::default(),
            birth_date: None,
            weight_kg: None,
            allergies: Vec::new(),
            notes: None,
        }
        .into_pet(
            "p1".to_string(),
            "t1".to_string(),
            Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap(),
        );
        store.insert(&pet).unwrap();

        let item = InventoryDraft {
            name: "Gauze".to_string(),
            sku: "gz-1".to_string(),
            category: InventoryCategory::Supply,
            quantity: 1,
            unit: "box".to_string(),
            reorder_level: 5,
            unit_cost_cents: 300,
            expires_on: None,
        }
        .into_item("inv1".to_string(), Utc::now());
        store.insert(&item).unwrap();

        let summary = summarize(&store, date(1), date(10)).unwrap();
        assert_eq!(summary.revenue_paid_cents, 5_000);
        assert_eq!(summary.outstanding_cents, 2_500);
        assert_eq!(summary.invoices_by_status["paid"], 1);
        assert_eq!(summary.invoices_by_status["draft"], 1);
        assert_eq!(summary.invoices_by_status["cancelled"], 0);
        assert_eq!(summary.appointments_by_status["scheduled"], 1);
        assert_eq!(summary.new_patients, 1);
        assert_eq!(summary.low_stock_items, 1);

        let keys: Vec<&str> = summary.invoices_by_status.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["draft", "pending", "paid", "cancelled"]);
    }

    #[test]
    fn test_revenue_saturates_on_stored_extremes() {
        let store = Store::in_memory().unwrap();
        store.insert(&invoice("i1", 3, i64::MAX, InvoiceStatus::Paid)).unwrap();
        store.insert(&invoice("i2", 4, i64::MAX, InvoiceStatus::Paid)).unwrap();

        let summary = summarize(&store, date(1), date(10)).unwrap();
        assert_eq!(summary.revenue_paid_cents, i64::MAX);
        assert_eq!(summary.invoices_by_status["paid"], 2);
    }
}
