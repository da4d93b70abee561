//! Identity claim and user roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Role of an account. Stored and transmitted in lower case.
///
/// `user` is accepted on input as an older name for [`UserRole::Applicant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum UserRole {
    Admin,
    Applicant,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Role must be either admin or applicant, got '{0}'")]
pub struct UnknownRole(pub String);

impl UserRole {
    pub const ALL: [UserRole; 2] = [UserRole::Admin, UserRole::Applicant];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Applicant => "applicant",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "applicant" | "user" => Ok(UserRole::Applicant),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl TryFrom<String> for UserRole {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Verified payload of a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    pub role: UserRole,
    /// Issued-at (Unix timestamp)
    pub iat: usize,
    /// Expiry (Unix timestamp)
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), r#""admin""#);
        assert_eq!(
            serde_json::to_string(&UserRole::Applicant).unwrap(),
            r#""applicant""#
        );
    }

    #[test]
    fn test_role_accepts_user_alias() {
        let role: UserRole = serde_json::from_str(r#""user""#).unwrap();
        assert_eq!(role, UserRole::Applicant);
        assert_eq!("Admin".parse::<UserRole>().unwrap(), UserRole::Admin);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(serde_json::from_str::<UserRole>(r#""superuser""#).is_err());
        assert_eq!(
            "root".parse::<UserRole>(),
            Err(UnknownRole("root".to_string()))
        );
    }

    #[test]
    fn test_claims_round_trip_through_json() {
        let id = Uuid::new_v4();
        let claims = Claims {
            sub: id.to_string(),
            role: UserRole::Applicant,
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains(r#""role":"applicant""#));

        let decoded: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.user_id(), Some(id));
        assert!(!decoded.is_admin());
    }

    #[test]
    fn test_user_id_rejects_garbage_subject() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            role: UserRole::Admin,
            iat: 0,
            exp: 0,
        };
        assert_eq!(claims.user_id(), None);
        assert!(claims.is_admin());
    }
}
