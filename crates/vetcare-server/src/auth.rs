//! Caller identity and route guards

use crate::error::ApiError;
use crate::router::Access;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vetcare_core::StaffRole;

/// What an authenticated caller is allowed to act as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Tutor,
    Professional(StaffRole),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Subject ID from the identity provider
    pub uid: String,
    pub role: Role,
}

/// Resolves bearer tokens to identities
pub trait AuthProvider: Send + Sync {
    fn authenticate(&self, token: &str) -> Option<Identity>;
}

/// One configured token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub uid: String,
    pub role: Role,
}

/// Fixed token table loaded from configuration
#[derive(Debug, Default)]
pub struct TokenAuthProvider {
    tokens: HashMap<String, Identity>,
}

impl TokenAuthProvider {
    pub fn new(entries: &[TokenEntry]) -> Self {
        let tokens = entries
            .iter()
            .map(|e| {
                (
                    e.token.clone(),
                    Identity {
                        uid: e.uid.clone(),
                        role: e.role,
                    },
                )
            })
            .collect();
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl AuthProvider for TokenAuthProvider {
    fn authenticate(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).cloned()
    }
}

/// Check a caller against a route's access level
pub fn authorize(access: Access, identity: Option<Identity>) -> Result<Option<Identity>, ApiError> {
    // An identity without a subject cannot own any record
    let identity = identity.filter(|i| !i.uid.trim().is_empty());
    if access == Access::Public {
        return Ok(identity);
    }
    let identity = identity.ok_or(ApiError::Unauthenticated)?;
    let allowed = match access {
        Access::Public | Access::Any => true,
        Access::Tutor => identity.role == Role::Tutor,
        Access::Professional => matches!(identity.role, Role::Professional(_)),
    };
    if allowed {
        Ok(Some(identity))
    } else {
        Err(ApiError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> TokenAuthProvider {
        TokenAuthProvider::new(&[
            TokenEntry {
                token: "tutor-token".to_string(),
                uid: "uid-ana".to_string(),
                role: Role::Tutor,
            },
            TokenEntry {
                token: "vet-token".to_string(),
                uid: "uid-vet".to_string(),
                role: Role::Professional(StaffRole::Veterinarian),
            },
        ])
    }

    #[test]
    fn test_token_lookup() {
        let auth = provider();
        assert_eq!(auth.len(), 2);
        assert_eq!(auth.authenticate("tutor-token").unwrap().uid, "uid-ana");
        assert!(auth.authenticate("nope").is_none());
    }

    #[test]
    fn test_authorize() {
        let auth = provider();
        let tutor = auth.authenticate("tutor-token");
        let vet = auth.authenticate("vet-token");

        assert!(authorize(Access::Public, None).unwrap().is_none());
        assert!(matches!(
            authorize(Access::Tutor, None),
            Err(ApiError::Unauthenticated)
        ));
        assert!(authorize(Access::Tutor, tutor.clone()).is_ok());
        assert!(matches!(
            authorize(Access::Tutor, vet.clone()),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            authorize(Access::Professional, tutor.clone()),
            Err(ApiError::Forbidden)
        ));
        assert!(authorize(Access::Professional, vet.clone()).is_ok());
        assert!(authorize(Access::Any, tutor).is_ok());
        assert!(authorize(Access::Any, vet).is_ok());
    }

    #[test]
    fn test_empty_subject_is_unauthenticated() {
        let blank = Some(Identity {
            uid: String::new(),
            role: Role::Tutor,
        });
        assert!(matches!(
            authorize(Access::Tutor, blank.clone()),
            Err(ApiError::Unauthenticated)
        ));
        assert!(authorize(Access::Public, blank).unwrap().is_none());
    }

    #[test]
    fn test_role_from_ron() {
        let entry: TokenEntry =
            ron::from_str(r#"(token: "t", uid: "u", role: professional(receptionist))"#).unwrap();
        assert_eq!(entry.role, Role::Professional(StaffRole::Receptionist));
    }
}
