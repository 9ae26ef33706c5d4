use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    #[serde(alias = "rol")]
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Authenticated principal as reported by the identity backend. `role` is still the raw spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn to_actor(&self) -> Actor {
        Actor {
            id: self.id.clone(),
            role: normalize_role(self.role.as_deref().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl Role {
    /// Strict parse of the spellings the backends are known to emit.
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_lowercase().as_str() {
            "admin" | "administrador" | "administrator" => Some(Role::Admin),
            "doctor" | "médico" | "medico" => Some(Role::Doctor),
            "patient" | "paciente" => Some(Role::Patient),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Doctor => write!(f, "doctor"),
            Role::Patient => write!(f, "patient"),
        }
    }
}

/// Collapse a backend-specific role spelling into a `Role`.
///
/// Called once when a session is established. Unknown spellings fall back to
/// `Patient`, the role with the fewest permissions.
pub fn normalize_role(raw: &str) -> Role {
    Role::parse(raw).unwrap_or_else(|| {
        warn!("Unknown role '{}', treating actor as patient", raw);
        Role::Patient
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Source of the current actor and the bearer credential attached to gateway calls.
pub trait IdentityProvider: Send + Sync {
    fn actor(&self) -> &Actor;

    fn bearer_token(&self) -> Option<&str>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_role_spellings() {
        assert_eq!(normalize_role("admin"), Role::Admin);
        assert_eq!(normalize_role("Administrador"), Role::Admin);
        assert_eq!(normalize_role("médico"), Role::Doctor);
        assert_eq!(normalize_role("MEDICO"), Role::Doctor);
        assert_eq!(normalize_role(" doctor "), Role::Doctor);
        assert_eq!(normalize_role("paciente"), Role::Patient);
        assert_eq!(normalize_role("patient"), Role::Patient);
    }

    #[test]
    fn test_unknown_role_degrades_to_patient() {
        assert_eq!(normalize_role("superuser"), Role::Patient);
        assert_eq!(normalize_role(""), Role::Patient);
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_user_to_actor() {
        let user = User {
            id: "42".to_string(),
            email: Some("doc@clinica.com".to_string()),
            role: Some("médico".to_string()),
            metadata: None,
            created_at: None,
        };

        assert_eq!(user.to_actor(), Actor::new("42", Role::Doctor));
    }

    #[test]
    fn test_claims_accept_spanish_role_key() {
        let claims: JwtClaims = serde_json::from_value(serde_json::json!({
            "sub": "7",
            "rol": "paciente"
        }))
        .unwrap();

        assert_eq!(claims.role.as_deref(), Some("paciente"));
    }
}
