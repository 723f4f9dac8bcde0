use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pet owner with a client-portal account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tutor {
    pub id: String,
    /// Subject issued by the authentication provider
    pub uid: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Profile form submitted by a tutor or by the front desk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl TutorDraft {
    pub fn into_tutor(self, id: String, uid: String, now: DateTime<Utc>) -> Tutor {
        Tutor {
            id,
            uid,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            address: self.address,
            created_at: now,
        }
    }

    /// Overwrite the editable fields of an existing tutor
    pub fn apply_to(self, tutor: &mut Tutor) {
        tutor.name = self.name.trim().to_string();
        tutor.email = self.email.trim().to_lowercase();
        tutor.phone = self.phone.trim().to_string();
        tutor.address = self.address;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_normalizes_contact_fields() {
        let draft = TutorDraft {
            name: "  Ana Souza ".to_string(),
            email: "Ana@Example.COM ".to_string(),
            phone: " +55 11 91234-5678".to_string(),
            address: None,
        };
        let tutor = draft.into_tutor("t1".into(), "uid-1".into(), Utc::now());
        assert_eq!(tutor.name, "Ana Souza");
        assert_eq!(tutor.email, "ana@example.com");
        assert_eq!(tutor.phone, "+55 11 91234-5678");
    }
}
