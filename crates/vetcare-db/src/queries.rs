//! Common query patterns for the database.
//!
//! Secondary-key scans use `start_with`, so every query re-checks exact
//! equality on the decoded record.

use crate::error::Result;
use crate::models::*;
use crate::store::{deduct_in, Store};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;
use vetcare_core::{
    Appointment, Collection, Handoff, InventoryItem, Invoice, InvoiceStatus, Pet, StaffMember,
    Tutor,
};

impl Store {
    /// Tutor owning an authentication subject.
    pub fn tutor_by_uid(&self, uid: &str) -> Result<Option<Tutor>> {
        // Walk-in tutors are stored without a uid
        if uid.is_empty() {
            return Ok(None);
        }
        let r = self.db.r_transaction()?;
        let scan = r.scan().secondary::<StoredTutor>(StoredTutorKey::uid)?;
        let iter = scan.start_with(uid.to_string())?;
        for stored in iter {
            let stored = stored?;
            if stored.uid == uid {
                return Ok(Some(Tutor::from_stored(&stored)?));
            }
        }
        Ok(None)
    }

    /// Staff member owning an authentication subject.
    pub fn staff_by_uid(&self, uid: &str) -> Result<Option<StaffMember>> {
        if uid.is_empty() {
            return Ok(None);
        }
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredStaffMember>(StoredStaffMemberKey::uid_key)?;
        let iter = scan.start_with(uid.to_string())?;
        for stored in iter {
            let stored = stored?;
            if stored.uid_key == uid {
                return Ok(Some(StaffMember::from_stored(&stored)?));
            }
        }
        Ok(None)
    }

    /// All pets of a tutor.
    pub fn pets_by_tutor(&self, tutor_id: &str) -> Result<Vec<Pet>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().secondary::<StoredPet>(StoredPetKey::tutor_id)?;
        let iter = scan.start_with(tutor_id.to_string())?;
        let stored: std::result::Result<Vec<StoredPet>, _> = iter.collect();
        stored?
            .iter()
            .filter(|s| s.tutor_id == tutor_id)
            .map(Pet::from_stored)
            .collect()
    }

    /// Appointments of one pet, oldest first.
    pub fn appointments_by_pet(&self, pet_id: &str) -> Result<Vec<Appointment>> {
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredAppointment>(StoredAppointmentKey::pet_id)?;
        let iter = scan.start_with(pet_id.to_string())?;
        let stored: std::result::Result<Vec<StoredAppointment>, _> = iter.collect();
        let appointments = stored?
            .iter()
            .filter(|s| s.pet_id == pet_id)
            .map(Appointment::from_stored)
            .collect::<Result<Vec<_>>>()?;
        Ok(sorted_by_start(appointments))
    }

    /// Appointments of one tutor, oldest first.
    pub fn appointments_by_tutor(&self, tutor_id: &str) -> Result<Vec<Appointment>> {
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredAppointment>(StoredAppointmentKey::tutor_id)?;
        let iter = scan.start_with(tutor_id.to_string())?;
        let stored: std::result::Result<Vec<StoredAppointment>, _> = iter.collect();
        let appointments = stored?
            .iter()
            .filter(|s| s.tutor_id == tutor_id)
            .map(Appointment::from_stored)
            .collect::<Result<Vec<_>>>()?;
        Ok(sorted_by_start(appointments))
    }

    /// Appointments assigned to a staff member, oldest first.
    pub fn appointments_by_staff(&self, staff_id: &str) -> Result<Vec<Appointment>> {
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredAppointment>(StoredAppointmentKey::staff_key)?;
        let iter = scan.start_with(staff_id.to_string())?;
        let stored: std::result::Result<Vec<StoredAppointment>, _> = iter.collect();
        let appointments = stored?
            .iter()
            .filter(|s| !s.staff_key.is_empty() && s.staff_key == staff_id)
            .map(Appointment::from_stored)
            .collect::<Result<Vec<_>>>()?;
        Ok(sorted_by_start(appointments))
    }

    /// Agenda for one day, optionally for a single staff member.
    pub fn appointments_on(&self, day: NaiveDate, staff_id: Option<&str>) -> Result<Vec<Appointment>> {
        let key = day_key(day);
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredAppointment>(StoredAppointmentKey::day)?;
        let iter = scan.start_with(key.clone())?;
        let stored: std::result::Result<Vec<StoredAppointment>, _> = iter.collect();
        let appointments = stored?
            .iter()
            .filter(|s| s.day == key)
            .filter(|s| staff_id.map_or(true, |id| s.staff_key == id))
            .map(Appointment::from_stored)
            .collect::<Result<Vec<_>>>()?;
        Ok(sorted_by_start(appointments))
    }

    /// Open appointments overlapping `[start, end)`.
    pub fn open_appointments_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>> {
        let mut found = Vec::new();
        let mut day = start.date_naive();
        // An appointment may start the day before and run past midnight
        if let Some(prev) = day.pred_opt() {
            day = prev;
        }
        while day <= end.date_naive() {
            for appt in self.appointments_on(day, None)? {
                if appt.status.is_open() && appt.overlaps(start, end) {
                    found.push(appt);
                }
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        Ok(sorted_by_start(found))
    }

    /// Invoices of one tutor, newest first.
    pub fn invoices_by_tutor(&self, tutor_id: &str) -> Result<Vec<Invoice>> {
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredInvoice>(StoredInvoiceKey::tutor_id)?;
        let iter = scan.start_with(tutor_id.to_string())?;
        let stored: std::result::Result<Vec<StoredInvoice>, _> = iter.collect();
        let mut invoices = stored?
            .iter()
            .filter(|s| s.tutor_id == tutor_id)
            .map(Invoice::from_stored)
            .collect::<Result<Vec<_>>>()?;
        invoices.sort_by(|a, b| b.issued_on.cmp(&a.issued_on));
        Ok(invoices)
    }

    /// Invoices in a given status.
    pub fn invoices_by_status(&self, status: InvoiceStatus) -> Result<Vec<Invoice>> {
        let key = status.as_str();
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredInvoice>(StoredInvoiceKey::status)?;
        let iter = scan.start_with(key.to_string())?;
        let stored: std::result::Result<Vec<StoredInvoice>, _> = iter.collect();
        stored?
            .iter()
            .filter(|s| s.status == key)
            .map(Invoice::from_stored)
            .collect()
    }

    /// Move an invoice to a new status.
    ///
    /// Issuing a draft (Draft → Pending) deducts the stock of its inventory
    /// lines in the same transaction, so a shortfall leaves the invoice a draft.
    pub fn transition_invoice(
        &self,
        id: &str,
        next: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> Result<Invoice> {
        let rw = self.db.rw_transaction()?;
        let old: Option<StoredInvoice> = rw.get().primary(id.to_string())?;
        let Some(old) = old else {
            return Err(vetcare_core::Error::not_found(Collection::Invoices, id).into());
        };
        let mut invoice = Invoice::from_stored(&old)?;
        let issuing = invoice.status == InvoiceStatus::Draft && next == InvoiceStatus::Pending;
        invoice.transition(next, now)?;
        if issuing {
            deduct_in(&rw, &invoice.stock_usage())?;
        }
        rw.update(old, invoice.to_stored()?)?;
        rw.commit()?;
        info!(invoice = id, status = next.as_str(), "invoice status changed");
        Ok(invoice)
    }

    /// Items at or below their reorder level.
    pub fn low_stock(&self) -> Result<Vec<InventoryItem>> {
        let mut items: Vec<InventoryItem> = self
            .all::<InventoryItem>()?
            .into_iter()
            .filter(InventoryItem::is_low_stock)
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    /// Handoffs still waiting for a human, newest first.
    pub fn open_handoffs(&self) -> Result<Vec<Handoff>> {
        let mut handoffs: Vec<Handoff> = self
            .all::<Handoff>()?
            .into_iter()
            .filter(|h| !h.resolved)
            .collect();
        handoffs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(handoffs)
    }
}

fn sorted_by_start(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
    appointments.sort_by(|a, b| a.starts_at.cmp(&b.starts_at));
    appointments
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use vetcare_core::{
        AppointmentDraft, AppointmentStatus, InventoryCategory, InventoryDraft, InvoiceDraft,
        InvoiceLine, PetDraft, Species, TutorDraft,
    };

    fn tutor(store: &Store, id: &str, uid: &str) {
        let tutor = TutorDraft {
            name: format!("Tutor {id}"),
            email: format!("{id}@example.com"),
            phone: "555-0100".to_string(),
            address: None,
        }
        .into_tutor(id.to_string(), uid.to_string(), Utc::now());
        store.insert(&tutor).unwrap();
    }

    fn pet(store: &Store, id: &str, tutor_id: &str) {
        let pet = PetDraft {
            name: format!("Pet {id}"),
            species: Species::Dog,
            breed: None,
            sex: Default::default(),
            birth_date: None,
            weight_kg: None,
            allergies: vec![],
            notes: None,
        }
        .into_pet(id.to_string(), tutor_id.to_string(), Utc::now());
        store.insert(&pet).unwrap();
    }

    fn appointment(store: &Store, id: &str, pet_id: &str, staff: Option<&str>, day: u32, hour: u32) {
        let appt = AppointmentDraft {
            pet_id: pet_id.to_string(),
            staff_id: staff.map(str::to_string),
            starts_at: Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap(),
            duration_minutes: 30,
            reason: "Checkup".to_string(),
            notes: None,
        }
        .into_appointment(id.to_string(), "t1".to_string(), Utc::now());
        store.insert(&appt).unwrap();
    }

    #[test]
    fn test_tutor_by_uid_is_exact() {
        let store = Store::in_memory().unwrap();
        tutor(&store, "t1", "uid-1");
        tutor(&store, "t10", "uid-10");

        assert_eq!(store.tutor_by_uid("uid-1").unwrap().unwrap().id, "t1");
        assert_eq!(store.tutor_by_uid("uid-10").unwrap().unwrap().id, "t10");
        assert!(store.tutor_by_uid("uid-2").unwrap().is_none());
    }

    #[test]
    fn test_empty_uid_never_matches_walk_in_tutor() {
        let store = Store::in_memory().unwrap();
        tutor(&store, "t-walkin", "");
        assert!(store.tutor_by_uid("").unwrap().is_none());
        assert!(store.staff_by_uid("").unwrap().is_none());
    }

    #[test]
    fn test_pets_by_tutor_filters_prefix_collisions() {
        let store = Store::in_memory().unwrap();
        pet(&store, "p1", "t1");
        pet(&store, "p2", "t1");
        pet(&store, "p3", "t10");

        let pets = store.pets_by_tutor("t1").unwrap();
        let mut ids: Vec<_> = pets.iter().map(|p| p.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn test_agenda_by_day_and_staff() {
        let store = Store::in_memory().unwrap();
        appointment(&store, "a1", "p1", Some("s1"), 10, 14);
        appointment(&store, "a2", "p2", Some("s2"), 10, 9);
        appointment(&store, "a3", "p1", None, 11, 9);

        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let agenda = store.appointments_on(day, None).unwrap();
        let ids: Vec<_> = agenda.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a1"]);

        let s1 = store.appointments_on(day, Some("s1")).unwrap();
        assert_eq!(s1.len(), 1);
        assert_eq!(store.appointments_by_pet("p1").unwrap().len(), 2);
        assert_eq!(store.appointments_by_staff("s2").unwrap().len(), 1);
        assert!(store.appointments_by_staff("").unwrap().is_empty());
    }

    #[test]
    fn test_open_appointments_between_skips_closed() {
        let store = Store::in_memory().unwrap();
        appointment(&store, "a1", "p1", None, 10, 10);
        appointment(&store, "a2", "p1", None, 10, 11);
        store
            .modify("a2", |a: &mut Appointment| {
                a.status = AppointmentStatus::Cancelled;
                Ok(())
            })
            .unwrap();

        let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 15, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 10, 11, 15, 0).unwrap();
        let found = store.open_appointments_between(start, end).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "a1");
    }

    #[test]
    fn test_issuing_invoice_consumes_stock() {
        let store = Store::in_memory().unwrap();
        let item = InventoryDraft {
            name: "V10 vaccine".to_string(),
            sku: "V10".to_string(),
            category: InventoryCategory::Vaccine,
            quantity: 1,
            unit: "dose".to_string(),
            reorder_level: 0,
            unit_cost_cents: 3_000,
            expires_on: None,
        }
        .into_item("v10".to_string(), Utc::now());
        store.insert(&item).unwrap();

        let draft = |id: &str| {
            InvoiceDraft {
                tutor_id: "t1".to_string(),
                appointment_id: None,
                lines: vec![InvoiceLine {
                    description: "V10".to_string(),
                    inventory_item_id: Some("v10".to_string()),
                    quantity: 1,
                    unit_price_cents: 9_000,
                }],
                issued_on: None,
            }
            .into_invoice(id.to_string(), Utc::now())
        };
        store.insert(&draft("i1")).unwrap();
        store.insert(&draft("i2")).unwrap();

        let issued = store
            .transition_invoice("i1", InvoiceStatus::Pending, Utc::now())
            .unwrap();
        assert_eq!(issued.status, InvoiceStatus::Pending);
        assert_eq!(store.fetch::<InventoryItem>("v10").unwrap().quantity, 0);
        assert!(store.low_stock().unwrap().iter().any(|i| i.id == "v10"));

        // No stock left: the second invoice stays a draft
        assert!(store
            .transition_invoice("i2", InvoiceStatus::Pending, Utc::now())
            .is_err());
        assert_eq!(
            store.fetch::<Invoice>("i2").unwrap().status,
            InvoiceStatus::Draft
        );

        assert_eq!(store.invoices_by_status(InvoiceStatus::Draft).unwrap().len(), 1);
        assert_eq!(store.invoices_by_status(InvoiceStatus::Pending).unwrap().len(), 1);
        assert_eq!(store.invoices_by_tutor("t1").unwrap().len(), 2);
    }
}
