//! Database store wrapper.

use crate::error::{Error, Result};
use crate::models::*;
use chrono::{DateTime, Utc};
use native_db::transaction::RwTransaction;
use native_db::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;
use vetcare_core::{Collection, InventoryItem};

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models.define::<StoredTutor>().unwrap();
    models.define::<StoredPet>().unwrap();
    models.define::<StoredAppointment>().unwrap();
    models.define::<StoredInvoice>().unwrap();
    models.define::<StoredInventoryItem>().unwrap();
    models.define::<StoredStaffMember>().unwrap();
    models.define::<StoredHandoff>().unwrap();
    models.define::<StoredReminder>().unwrap();
    models
});

/// Document store holding every clinic collection.
pub struct Store {
    pub(crate) db: Database<'static>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new()
            .create(&MODELS, path.as_ref())
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self { db })
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(Self { db })
    }

    /// Insert a new document. Fails if the ID is already taken.
    pub fn insert<D: Document>(&self, record: &D) -> Result<()> {
        let stored = record.to_stored()?;
        let rw = self.db.rw_transaction()?;
        rw.insert(stored)?;
        rw.commit()?;
        debug!(collection = %D::COLLECTION, id = record.id(), "inserted");
        Ok(())
    }

    /// Load a document by ID.
    pub fn get<D: Document>(&self, id: &str) -> Result<Option<D>> {
        let r = self.db.r_transaction()?;
        let stored: Option<D::Stored> = r.get().primary(id.to_string())?;
        stored.as_ref().map(D::from_stored).transpose()
    }

    /// Load a document by ID, treating absence as an error.
    pub fn fetch<D: Document>(&self, id: &str) -> Result<D> {
        self.get(id)?
            .ok_or_else(|| vetcare_core::Error::not_found(D::COLLECTION, id).into())
    }

    /// Replace an existing document.
    pub fn update<D: Document>(&self, record: &D) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        let old: Option<D::Stored> = rw.get().primary(record.id().to_string())?;
        let Some(old) = old else {
            return Err(vetcare_core::Error::not_found(D::COLLECTION, record.id()).into());
        };
        rw.update(old, record.to_stored()?)?;
        rw.commit()?;
        debug!(collection = %D::COLLECTION, id = record.id(), "updated");
        Ok(())
    }

    /// Read, change and write back one document inside a single transaction.
    pub fn modify<D, F>(&self, id: &str, change: F) -> Result<D>
    where
        D: Document,
        F: FnOnce(&mut D) -> vetcare_core::Result<()>,
    {
        let rw = self.db.rw_transaction()?;
        let old: Option<D::Stored> = rw.get().primary(id.to_string())?;
        let Some(old) = old else {
            return Err(vetcare_core::Error::not_found(D::COLLECTION, id).into());
        };
        let mut record = D::from_stored(&old)?;
        change(&mut record)?;
        rw.update(old, record.to_stored()?)?;
        rw.commit()?;
        debug!(collection = %D::COLLECTION, id, "modified");
        Ok(record)
    }

    /// Delete a document, returning what was removed.
    pub fn delete<D: Document>(&self, id: &str) -> Result<D> {
        let rw = self.db.rw_transaction()?;
        let stored: Option<D::Stored> = rw.get().primary(id.to_string())?;
        let Some(stored) = stored else {
            return Err(vetcare_core::Error::not_found(D::COLLECTION, id).into());
        };
        let record = D::from_stored(&stored)?;
        rw.remove(stored)?;
        rw.commit()?;
        debug!(collection = %D::COLLECTION, id, "deleted");
        Ok(record)
    }

    /// Load every document of a collection.
    pub fn all<D: Document>(&self) -> Result<Vec<D>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<D::Stored>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<D::Stored>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        stored.iter().map(D::from_stored).collect()
    }

    /// Deduct stock for several items atomically.
    ///
    /// Either every item has enough quantity and all are written, or nothing
    /// is committed and `InsufficientStock` names the first short item.
    pub fn deduct_stock(&self, usage: &[(String, u32)]) -> Result<Vec<InventoryItem>> {
        let rw = self.db.rw_transaction()?;
        let updated = deduct_in(&rw, usage)?;
        rw.commit()?;
        debug!(items = updated.len(), "stock deducted");
        Ok(updated)
    }

    /// Whether a job email with this key was already sent.
    pub fn reminder_sent(&self, key: &str) -> Result<bool> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredReminder> = r.get().primary(key.to_string())?;
        Ok(stored.is_some())
    }

    /// Remember that a job email was sent.
    pub fn record_reminder(&self, key: &str, sent_at: DateTime<Utc>) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        rw.upsert(StoredReminder {
            key: key.to_string(),
            sent_at,
        })?;
        rw.commit()?;
        Ok(())
    }
}

/// Stock deduction body, shared by every transaction that consumes stock.
pub(crate) fn deduct_in(
    rw: &RwTransaction<'_>,
    usage: &[(String, u32)],
) -> Result<Vec<InventoryItem>> {
    // Sum repeated items so one request cannot overdraw by splitting lines;
    // u64 holds any number of u32 lines without wrapping
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for (id, qty) in usage {
        let total = totals.entry(id.as_str()).or_insert(0);
        *total = total.saturating_add(u64::from(*qty));
    }

    let mut updated = Vec::with_capacity(totals.len());
    for (id, requested) in totals {
        let stored: Option<StoredInventoryItem> = rw.get().primary(id.to_string())?;
        let Some(stored) = stored else {
            return Err(vetcare_core::Error::not_found(Collection::Inventory, id).into());
        };
        let mut item = InventoryItem::from_stored(&stored)?;
        let Some(remaining) = u32::try_from(requested)
            .ok()
            .and_then(|requested| item.quantity.checked_sub(requested))
        else {
            return Err(vetcare_core::Error::InsufficientStock {
                item_id: id.to_string(),
                requested: u32::try_from(requested).unwrap_or(u32::MAX),
                available: item.quantity,
            }
            .into());
        };
        item.quantity = remaining;
        rw.update(stored, item.to_stored()?)?;
        updated.push(item);
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vetcare_core::{InventoryCategory, InventoryDraft, Pet, PetDraft, Species};

    fn pet(id: &str, tutor: &str) -> Pet {
        PetDraft {
            name: format!("pet {id}"),
            species: Species::Cat,
            breed: None,
            sex: Default::default(),
            birth_date: None,
            weight_kg: None,
            allergies: vec![],
            notes: None,
        }
        .into_pet(id.to_string(), tutor.to_string(), Utc::now())
    }

    pub(crate) fn item(store: &Store, id: &str, quantity: u32) {
        let item = InventoryDraft {
            name: format!("item {id}"),
            sku: id.to_string(),
            category: InventoryCategory::Vaccine,
            quantity,
            unit: "dose".to_string(),
            reorder_level: 2,
            unit_cost_cents: 1_000,
            expires_on: None,
        }
        .into_item(id.to_string(), Utc::now());
        store.insert(&item).unwrap();
    }

    #[test]
    fn test_crud_round() {
        let store = Store::in_memory().unwrap();
        store.insert(&pet("p1", "t1")).unwrap();

        let mut loaded: Pet = store.fetch("p1").unwrap();
        assert_eq!(loaded.tutor_id, "t1");

        loaded.name = "Luna".to_string();
        store.update(&loaded).unwrap();
        assert_eq!(store.fetch::<Pet>("p1").unwrap().name, "Luna");

        let removed: Pet = store.delete("p1").unwrap();
        assert_eq!(removed.name, "Luna");
        assert!(store.get::<Pet>("p1").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let store = Store::in_memory().unwrap();
        store.insert(&pet("p1", "t1")).unwrap();
        assert!(store.insert(&pet("p1", "t2")).is_err());
    }

    #[test]
    fn test_missing_documents_are_not_found() {
        let store = Store::in_memory().unwrap();
        let err = store.update(&pet("ghost", "t1")).unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(vetcare_core::Error::NotFound { .. })
        ));
        assert!(store.delete::<Pet>("ghost").is_err());
        assert!(store.fetch::<Pet>("ghost").is_err());
    }

    #[test]
    fn test_modify_applies_change() {
        let store = Store::in_memory().unwrap();
        store.insert(&pet("p1", "t1")).unwrap();
        let pet: Pet = store
            .modify("p1", |p: &mut Pet| {
                p.allergies.push("pollen".to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(pet.allergies, vec!["pollen"]);
        assert_eq!(store.fetch::<Pet>("p1").unwrap().allergies, vec!["pollen"]);
    }

    #[test]
    fn test_modify_error_leaves_document_untouched() {
        let store = Store::in_memory().unwrap();
        store.insert(&pet("p1", "t1")).unwrap();
        let result = store.modify("p1", |p: &mut Pet| {
            p.name = "changed".to_string();
            Err(vetcare_core::Error::Forbidden)
        });
        assert!(result.is_err());
        assert_eq!(store.fetch::<Pet>("p1").unwrap().name, "pet p1");
    }

    #[test]
    fn test_deduct_stock_all_or_nothing() {
        let store = Store::in_memory().unwrap();
        item(&store, "a", 10);
        item(&store, "b", 1);

        let err = store
            .deduct_stock(&[("a".to_string(), 3), ("b".to_string(), 2)])
            .unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(vetcare_core::Error::InsufficientStock { requested: 2, available: 1, .. })
        ));
        assert_eq!(store.fetch::<InventoryItem>("a").unwrap().quantity, 10);

        let updated = store
            .deduct_stock(&[("a".to_string(), 3), ("b".to_string(), 1)])
            .unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(store.fetch::<InventoryItem>("a").unwrap().quantity, 7);
        assert_eq!(store.fetch::<InventoryItem>("b").unwrap().quantity, 0);
    }

    #[test]
    fn test_deduct_stock_sums_repeated_items() {
        let store = Store::in_memory().unwrap();
        item(&store, "a", 5);
        let result = store.deduct_stock(&[("a".to_string(), 3), ("a".to_string(), 3)]);
        assert!(result.is_err());
        assert_eq!(store.fetch::<InventoryItem>("a").unwrap().quantity, 5);
    }

    #[test]
    fn test_deduct_stock_huge_repeated_quantities_are_insufficient() {
        let store = Store::in_memory().unwrap();
        item(&store, "a", 10);
        let err = store
            .deduct_stock(&[("a".to_string(), u32::MAX), ("a".to_string(), 2)])
            .unwrap_err();
        assert!(matches!(
            err.as_core(),
            Some(vetcare_core::Error::InsufficientStock { requested: u32::MAX, available: 10, .. })
        ));
        assert_eq!(store.fetch::<InventoryItem>("a").unwrap().quantity, 10);
    }

    #[test]
    fn test_reminder_log() {
        let store = Store::in_memory().unwrap();
        assert!(!store.reminder_sent("vaccine:p1:2025-03-01").unwrap());
        store
            .record_reminder("vaccine:p1:2025-03-01", Utc::now())
            .unwrap();
        assert!(store.reminder_sent("vaccine:p1:2025-03-01").unwrap());
    }
}
