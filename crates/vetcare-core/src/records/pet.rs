use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Animal species handled by the clinic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Dog,
    Cat,
    Bird,
    Rabbit,
    Reptile,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

/// Kind of a medical history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Consultation,
    Vaccination,
    Surgery,
    Exam,
    Treatment,
    Note,
}

/// One line of a pet's medical history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub kind: HistoryKind,
    pub description: String,
    #[serde(default)]
    pub staff_id: Option<String>,
    /// Next due date, only meaningful for vaccinations
    #[serde(default)]
    pub next_due: Option<NaiveDate>,
}

/// A patient of the clinic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: String,
    pub tutor_id: String,
    pub name: String,
    pub species: Species,
    pub breed: Option<String>,
    pub sex: Sex,
    pub birth_date: Option<NaiveDate>,
    pub weight_kg: Option<f64>,
    pub allergies: Vec<String>,
    pub notes: Option<String>,
    pub last_vaccination: Option<NaiveDate>,
    pub next_vaccination_due: Option<NaiveDate>,
    pub last_checkup: Option<NaiveDate>,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
}

impl Pet {
    /// Age in whole years on the given day
    pub fn age_years(&self, today: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        if birth > today {
            return None;
        }
        let mut years = today.year() - birth.year();
        if (today.month(), today.day()) < (birth.month(), birth.day()) {
            years -= 1;
        }
        Some(years.max(0) as u32)
    }

    /// Append a history entry and update the derived care dates
    pub fn record_history(&mut self, entry: HistoryEntry) {
        match entry.kind {
            HistoryKind::Vaccination => {
                if self.last_vaccination.map_or(true, |d| d <= entry.date) {
                    self.last_vaccination = Some(entry.date);
                }
                if entry.next_due.is_some() {
                    self.next_vaccination_due = entry.next_due;
                }
            }
            HistoryKind::Consultation | HistoryKind::Exam => {
                if self.last_checkup.map_or(true, |d| d <= entry.date) {
                    self.last_checkup = Some(entry.date);
                }
            }
            _ => {}
        }
        self.history.push(entry);
    }

    /// History sorted newest first
    pub fn history_newest_first(&self) -> Vec<HistoryEntry> {
        let mut entries = self.history.clone();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries
    }
}

/// Pet form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetDraft {
    pub name: String,
    pub species: Species,
    #[serde(default)]
    pub breed: Option<String>,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PetDraft {
    pub fn into_pet(self, id: String, tutor_id: String, now: DateTime<Utc>) -> Pet {
        Pet {
            id,
            tutor_id,
            name: self.name.trim().to_string(),
            species: self.species,
            breed: self.breed,
            sex: self.sex,
            birth_date: self.birth_date,
            weight_kg: self.weight_kg,
            allergies: self.allergies,
            notes: self.notes,
            last_vaccination: None,
            next_vaccination_due: None,
            last_checkup: None,
            history: Vec::new(),
            created_at: now,
        }
    }

    /// Overwrite the form fields of an existing pet, keeping its history
    pub fn apply_to(self, pet: &mut Pet) {
        pet.name = self.name.trim().to_string();
        pet.species = self.species;
        pet.breed = self.breed;
        pet.sex = self.sex;
        pet.birth_date = self.birth_date;
        pet.weight_kg = self.weight_kg;
        pet.allergies = self.allergies;
        pet.notes = self.notes;
    }
}
