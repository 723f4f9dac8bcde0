use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Veterinarian,
    Technician,
    Receptionist,
    Admin,
}

/// A weekly working window, in UTC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Shift {
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        let time = at.time();
        at.weekday() == self.weekday && self.start <= time && time < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: String,
    /// Subject issued by the authentication provider, once the member has an account
    pub uid: Option<String>,
    pub name: String,
    pub email: String,
    pub role: StaffRole,
    pub specialty: Option<String>,
    pub active: bool,
    pub shifts: Vec<Shift>,
    pub created_at: DateTime<Utc>,
}

impl StaffMember {
    pub fn on_duty_at(&self, at: DateTime<Utc>) -> bool {
        self.active && self.shifts.iter().any(|s| s.covers(at))
    }
}

/// Staff form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffDraft {
    #[serde(default)]
    pub uid: Option<String>,
    pub name: String,
    pub email: String,
    pub role: StaffRole,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub shifts: Vec<Shift>,
}

fn default_active() -> bool {
    true
}

impl StaffDraft {
    pub fn into_member(self, id: String, now: DateTime<Utc>) -> StaffMember {
        StaffMember {
            id,
            uid: self.uid,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            role: self.role,
            specialty: self.specialty,
            active: self.active,
            shifts: self.shifts,
            created_at: now,
        }
    }

    pub fn apply_to(self, member: &mut StaffMember) {
        member.uid = self.uid;
        member.name = self.name.trim().to_string();
        member.email = self.email.trim().to_lowercase();
        member.role = self.role;
        member.specialty = self.specialty;
        member.active = self.active;
        member.shifts = self.shifts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn vet() -> StaffMember {
        StaffDraft {
            uid: None,
            name: "Dr. Lima".to_string(),
            email: "lima@clinic.test".to_string(),
            role: StaffRole::Veterinarian,
            specialty: Some("Surgery".to_string()),
            active: true,
            shifts: vec![Shift {
                weekday: Weekday::Mon,
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            }],
        }
        .into_member("s1".into(), Utc::now())
    }

    #[test]
    fn test_on_duty() {
        let mut vet = vet();
        // 2025-01-06 is a Monday
        let monday_noon = Utc.with_ymd_and_hms(2025, 1, 6, 12, 0, 0).unwrap();
        let monday_close = Utc.with_ymd_and_hms(2025, 1, 6, 17, 0, 0).unwrap();
        let tuesday_noon = Utc.with_ymd_and_hms(2025, 1, 7, 12, 0, 0).unwrap();
        assert!(vet.on_duty_at(monday_noon));
        assert!(!vet.on_duty_at(monday_close));
        assert!(!vet.on_duty_at(tuesday_noon));

        vet.active = false;
        assert!(!vet.on_duty_at(monday_noon));
    }
}
