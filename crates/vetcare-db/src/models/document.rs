//! Mapping between clinic records and stored documents.

use super::records::*;
use crate::error::{Error, Result};
use native_db::ToInput;
use serde::{de::DeserializeOwned, Serialize};
use vetcare_core::{
    Appointment, Collection, Handoff, InventoryItem, Invoice, Pet, StaffMember, Tutor,
};

/// A record that lives in its own collection.
pub trait Document: Sized + Clone {
    /// Database model backing the collection.
    type Stored: ToInput + Clone;

    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn to_stored(&self) -> Result<Self::Stored>;

    fn from_stored(stored: &Self::Stored) -> Result<Self>;
}

fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    bincode::serialize(record).map_err(|e| Error::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| Error::Serialization(e.to_string()))
}

impl Document for Tutor {
    type Stored = StoredTutor;
    const COLLECTION: Collection = Collection::Tutors;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_stored(&self) -> Result<StoredTutor> {
        Ok(StoredTutor {
            id: self.id.clone(),
            uid: self.uid.clone(),
            body: encode(self)?,
        })
    }

    fn from_stored(stored: &StoredTutor) -> Result<Self> {
        decode(&stored.body)
    }
}

impl Document for Pet {
    type Stored = StoredPet;
    const COLLECTION: Collection = Collection::Pets;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_stored(&self) -> Result<StoredPet> {
        Ok(StoredPet {
            id: self.id.clone(),
            tutor_id: self.tutor_id.clone(),
            body: encode(self)?,
        })
    }

    fn from_stored(stored: &StoredPet) -> Result<Self> {
        decode(&stored.body)
    }
}

impl Document for Appointment {
    type Stored = StoredAppointment;
    const COLLECTION: Collection = Collection::Appointments;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_stored(&self) -> Result<StoredAppointment> {
        Ok(StoredAppointment {
            id: self.id.clone(),
            pet_id: self.pet_id.clone(),
            tutor_id: self.tutor_id.clone(),
            staff_key: self.staff_id.clone().unwrap_or_default(),
            day: day_key(self.day()),
            body: encode(self)?,
        })
    }

    fn from_stored(stored: &StoredAppointment) -> Result<Self> {
        decode(&stored.body)
    }
}

impl Document for Invoice {
    type Stored = StoredInvoice;
    const COLLECTION: Collection = Collection::Invoices;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_stored(&self) -> Result<StoredInvoice> {
        Ok(StoredInvoice {
            id: self.id.clone(),
            tutor_id: self.tutor_id.clone(),
            status: self.status.as_str().to_string(),
            body: encode(self)?,
        })
    }

    fn from_stored(stored: &StoredInvoice) -> Result<Self> {
        decode(&stored.body)
    }
}

impl Document for InventoryItem {
    type Stored = StoredInventoryItem;
    const COLLECTION: Collection = Collection::Inventory;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_stored(&self) -> Result<StoredInventoryItem> {
        Ok(StoredInventoryItem {
            id: self.id.clone(),
            body: encode(self)?,
        })
    }

    fn from_stored(stored: &StoredInventoryItem) -> Result<Self> {
        decode(&stored.body)
    }
}

impl Document for StaffMember {
    type Stored = StoredStaffMember;
    const COLLECTION: Collection = Collection::Staff;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_stored(&self) -> Result<StoredStaffMember> {
        Ok(StoredStaffMember {
            id: self.id.clone(),
            uid_key: self.uid.clone().unwrap_or_default(),
            body: encode(self)?,
        })
    }

    fn from_stored(stored: &StoredStaffMember) -> Result<Self> {
        decode(&stored.body)
    }
}

impl Document for Handoff {
    type Stored = StoredHandoff;
    const COLLECTION: Collection = Collection::Handoffs;

    fn id(&self) -> &str {
        &self.id
    }

    fn to_stored(&self) -> Result<StoredHandoff> {
        Ok(StoredHandoff {
            id: self.id.clone(),
            body: encode(self)?,
        })
    }

    fn from_stored(stored: &StoredHandoff) -> Result<Self> {
        decode(&stored.body)
    }
}

/// Secondary key used for the agenda index
pub(crate) fn day_key(day: chrono::NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}
