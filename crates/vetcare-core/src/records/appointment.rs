use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no_show",
        }
    }

    /// Whether the slot is still held on the agenda
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed
        )
    }

    /// Only open appointments may move, and never back to scheduled
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.is_open() && next != AppointmentStatus::Scheduled && *self != next
    }
}

/// A booked visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub pet_id: String,
    pub tutor_id: String,
    pub staff_id: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub reason: String,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Calendar day (UTC) the appointment starts on
    pub fn day(&self) -> NaiveDate {
        self.starts_at.date_naive()
    }

    /// Half-open interval overlap with `[start, end)`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.starts_at < end && start < self.ends_at()
    }
}

/// Booking form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDraft {
    pub pet_id: String,
    #[serde(default)]
    pub staff_id: Option<String>,
    pub starts_at: DateTime<Utc>,
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_duration() -> u32 {
    30
}

impl AppointmentDraft {
    pub fn into_appointment(self, id: String, tutor_id: String, now: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            pet_id: self.pet_id,
            tutor_id,
            staff_id: self.staff_id,
            starts_at: self.starts_at,
            duration_minutes: self.duration_minutes,
            reason: self.reason.trim().to_string(),
            status: AppointmentStatus::Scheduled,
            notes: self.notes,
            created_at: now,
        }
    }

    /// Reschedule or reassign an existing appointment
    pub fn apply_to(self, appointment: &mut Appointment) {
        appointment.pet_id = self.pet_id;
        appointment.staff_id = self.staff_id;
        appointment.starts_at = self.starts_at;
        appointment.duration_minutes = self.duration_minutes;
        appointment.reason = self.reason.trim().to_string();
        appointment.notes = self.notes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn appointment(hour: u32, minutes: u32) -> Appointment {
        AppointmentDraft {
            pet_id: "p1".to_string(),
            staff_id: None,
            starts_at: Utc.with_ymd_and_hms(2025, 1, 10, hour, 0, 0).unwrap(),
            duration_minutes: minutes,
            reason: "Checkup".to_string(),
            notes: None,
        }
        .into_appointment("a1".into(), "t1".into(), Utc::now())
    }

    #[test]
    fn test_overlap_is_half_open() {
        let appt = appointment(10, 30);
        let at = |h, m| Utc.with_ymd_and_hms(2025, 1, 10, h, m, 0).unwrap();
        assert!(appt.overlaps(at(10, 15), at(10, 45)));
        assert!(appt.overlaps(at(9, 45), at(10, 1)));
        assert!(!appt.overlaps(at(10, 30), at(11, 0)));
        assert!(!appt.overlaps(at(9, 30), at(10, 0)));
    }

    #[test]
    fn test_status_transitions() {
        use AppointmentStatus::*;
        assert!(Scheduled.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Scheduled.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Scheduled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(NoShow));
        assert!(!Scheduled.can_transition_to(Scheduled));
    }

    #[test]
    fn test_ends_at_and_day() {
        let appt = appointment(23, 90);
        assert_eq!(
            appt.ends_at(),
            Utc.with_ymd_and_hms(2025, 1, 11, 0, 30, 0).unwrap()
        );
        assert_eq!(appt.day(), NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
    }
}
