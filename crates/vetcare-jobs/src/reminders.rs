//! Daily scan for vaccination and checkup reminders.

use crate::error::{Error, Result};
use crate::mail::Mailer;
use crate::templates::{checkup_reminder, vaccination_reminder, ClinicInfo};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use vetcare_core::{Pet, Tutor};
use vetcare_db::Store;

/// Days ahead of `next_vaccination_due` a reminder goes out
pub const VACCINATION_LEAD_DAYS: i64 = 7;
/// Days after the last checkup a new one is recommended
pub const CHECKUP_INTERVAL_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reminder {
    Vaccination { due: NaiveDate },
    Checkup { last: Option<NaiveDate> },
}

impl Reminder {
    /// Reminder-log key; one email per pet per period
    pub fn key(&self, pet_id: &str, today: NaiveDate) -> String {
        match self {
            Reminder::Vaccination { due } => format!("vaccination:{pet_id}:{due}"),
            Reminder::Checkup { .. } => format!("checkup:{pet_id}:{}", today.format("%Y-%m")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub scanned: usize,
    pub sent: usize,
    /// Already sent for this period
    pub skipped: usize,
    pub failed: usize,
}

/// Reminders a pet qualifies for on `today`
pub fn due_reminders(pet: &Pet, today: NaiveDate) -> Vec<Reminder> {
    let mut due = Vec::new();

    if let Some(next) = pet.next_vaccination_due {
        let days = (next - today).num_days();
        if (0..=VACCINATION_LEAD_DAYS).contains(&days) {
            due.push(Reminder::Vaccination { due: next });
        }
    }

    let checkup_due = match pet.last_checkup {
        Some(last) => (today - last).num_days() >= CHECKUP_INTERVAL_DAYS,
        None => pet.age_years(today).is_some_and(|age| age >= 1),
    };
    if checkup_due {
        due.push(Reminder::Checkup {
            last: pet.last_checkup,
        });
    }

    due
}

/// Send every due reminder that has not gone out yet.
///
/// A failure for one pet is logged and counted; the scan moves on.
pub async fn run_reminder_scan(
    store: &Store,
    mailer: &dyn Mailer,
    clinic: &ClinicInfo,
    today: NaiveDate,
) -> Result<ScanReport> {
    let pets = store.all::<Pet>()?;
    let mut report = ScanReport::default();

    for pet in &pets {
        report.scanned += 1;
        for reminder in due_reminders(pet, today) {
            match send_reminder(store, mailer, clinic, pet, reminder, today).await {
                Ok(true) => report.sent += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(pet = %pet.id, reminder = ?reminder, error = %e, "reminder failed");
                }
            }
        }
    }

    info!(
        scanned = report.scanned,
        sent = report.sent,
        skipped = report.skipped,
        failed = report.failed,
        "reminder scan finished"
    );
    Ok(report)
}

async fn send_reminder(
    store: &Store,
    mailer: &dyn Mailer,
    clinic: &ClinicInfo,
    pet: &Pet,
    reminder: Reminder,
    today: NaiveDate,
) -> Result<bool> {
    let key = reminder.key(&pet.id, today);
    if store.reminder_sent(&key)? {
        debug!(key = %key, "reminder already sent");
        return Ok(false);
    }

    let Some(tutor) = store.get::<Tutor>(&pet.tutor_id)? else {
        warn!(pet = %pet.id, tutor = %pet.tutor_id, "pet has no tutor record");
        return Err(Error::Skipped(format!("tutor {} not found", pet.tutor_id)));
    };

    let email = match reminder {
        Reminder::Vaccination { due } => vaccination_reminder(clinic, &tutor, pet, due),
        Reminder::Checkup { last } => checkup_reminder(clinic, &tutor, pet, last),
    };
    mailer.send(&email).await?;
    store.record_reminder(&key, Utc::now())?;
    debug!(key = %key, to = %email.to, "reminder sent");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::MemoryMailer;
    use vetcare_core::{PetDraft, Species, TutorDraft};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2024, 6, 1)
    }

    fn pet(id: &str, tutor_id: &str) -> Pet {
        PetDraft {
            name: format!("Pet {id}"),
            species: Species::Dog,
            breed: None,
            sex: Default::default(),
            birth_date: Some(date(2023, 12, 1)),
            weight_kg: None,
            allergies: Vec::new(),
            notes: None,
        }
        .into_pet(id.to_string(), tutor_id.to_string(), Utc::now())
    }

    fn tutor(store: &Store, id: &str, email: &str) {
        let tutor = TutorDraft {
            name: "Ana".to_string(),
            email: email.to_string(),
            phone: "555-0101".to_string(),
            address: None,
        }
        .into_tutor(id.to_string(), format!("uid-{id}"), Utc::now());
        store.insert(&tutor).unwrap();
    }

    #[test]
    fn test_vaccination_threshold() {
        let mut p = pet("p1", "t1");
        p.last_checkup = Some(date(2024, 1, 1));
        for (due, expected) in [
            (date(2024, 5, 31), false),
            (date(2024, 6, 1), true),
            (date(2024, 6, 8), true),
            (date(2024, 6, 9), false),
        ] {
            p.next_vaccination_due = Some(due);
            assert_eq!(
                due_reminders(&p, today()) == vec![Reminder::Vaccination { due }],
                expected,
                "due {due}"
            );
        }
    }

    #[test]
    fn test_checkup_threshold() {
        let mut p = pet("p1", "t1");
        p.last_checkup = Some(date(2023, 6, 3));
        assert!(due_reminders(&p, today()).is_empty());
        p.last_checkup = Some(date(2023, 6, 2));
        assert_eq!(
            due_reminders(&p, today()),
            vec![Reminder::Checkup {
                last: Some(date(2023, 6, 2))
            }]
        );

        // Never examined: only once older than a year
        p.last_checkup = None;
        assert!(due_reminders(&p, today()).is_empty());
        p.birth_date = Some(date(2023, 5, 1));
        assert_eq!(due_reminders(&p, today()), vec![Reminder::Checkup { last: None }]);
        p.birth_date = None;
        assert!(due_reminders(&p, today()).is_empty());
    }

    #[tokio::test]
    async fn test_scan_sends_once() {
        let store = Store::in_memory().unwrap();
        tutor(&store, "t1", "ana@example.com");
        let mut due = pet("p1", "t1");
        due.next_vaccination_due = Some(date(2024, 6, 3));
        due.last_checkup = Some(date(2022, 1, 1));
        store.insert(&due).unwrap();
        store.insert(&pet("p2", "t1")).unwrap();

        let mailer = MemoryMailer::default();
        let clinic = ClinicInfo::default();

        let report = run_reminder_scan(&store, &mailer, &clinic, today()).await.unwrap();
        assert_eq!(
            report,
            ScanReport {
                scanned: 2,
                sent: 2,
                skipped: 0,
                failed: 0
            }
        );
        let sent = mailer.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|e| e.to == "ana@example.com"));

        let rerun = run_reminder_scan(&store, &mailer, &clinic, today()).await.unwrap();
        assert_eq!(rerun.sent, 0);
        assert_eq!(rerun.skipped, 2);
        assert_eq!(mailer.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_scan_continues_after_failures() {
        let store = Store::in_memory().unwrap();
        tutor(&store, "t1", "bounce@example.com");
        tutor(&store, "t2", "ana@example.com");
        for (id, tutor_id) in [("p1", "t1"), ("p2", "t2"), ("p3", "missing")] {
            let mut p = pet(id, tutor_id);
            p.next_vaccination_due = Some(today());
            p.last_checkup = Some(today());
            store.insert(&p).unwrap();
        }

        let mailer = MemoryMailer::rejecting("bounce@example.com");
        let report = run_reminder_scan(&store, &mailer, &ClinicInfo::default(), today())
            .await
            .unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 2);

        // Failed sends are not logged, so they are retried next run
        assert!(!store.reminder_sent(&format!("vaccination:p1:{}", today())).unwrap());
    }
}
