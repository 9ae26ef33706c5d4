use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{normalize_role, Actor};

use crate::session::Session;

pub struct TestConfig {
    pub jwt_secret: String,
    pub api_url: String,
    pub api_token: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            api_url: "http://localhost:3000/api".to_string(),
            api_token: "test-api-token".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_api_url(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_url: self.api_url.clone(),
            api_token: self.api_token.clone(),
            jwt_secret: self.jwt_secret.clone(),
            actor_id: String::new(),
            actor_role: String::new(),
            use_status_endpoints: false,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// A user as the backend spells it (Spanish role names).
pub struct TestActor {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestActor {
    fn default() -> Self {
        Self::new("paciente@clinica.com", "paciente")
    }
}

impl TestActor {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn doctor() -> Self {
        Self::new("medico@clinica.com", "médico")
    }

    pub fn patient() -> Self {
        Self::new("paciente@clinica.com", "paciente")
    }

    pub fn admin() -> Self {
        Self::new("admin@clinica.com", "administrador")
    }

    pub fn to_actor(&self) -> Actor {
        Actor::new(self.id.clone(), normalize_role(&self.role))
    }

    pub fn session(&self, token: &str) -> Session {
        Session::new(self.to_actor(), Some(token.to_string()))
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(actor: &TestActor, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": actor.id,
            "email": actor.email,
            "rol": actor.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        Self::sign(&header, &payload, secret)
    }

    pub fn create_expired_token(actor: &TestActor, secret: &str) -> String {
        Self::create_test_token(actor, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(actor: &TestActor) -> String {
        Self::create_test_token(actor, "some-other-secret", None)
    }

    fn sign(header: &Value, payload: &Value, secret: &str) -> String {
        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());
        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature_encoded)
    }
}

/// Raw records in the shapes the clinic backend actually returns.
pub struct MockGatewayResponses;

impl MockGatewayResponses {
    pub fn appointment_response(id: u64, estado: &str) -> Value {
        json!({
            "id": id,
            "paciente_id": 10,
            "medico_id": 20,
            "consultorio_id": 3,
            "fecha_hora": "2025-03-14T09:30:00Z",
            "motivo": "Control general",
            "notas": null,
            "estado": estado,
            "paciente": {
                "id": 10,
                "usuario": { "nombre": "Lucía", "apellido": "Fernández", "correo": "lucia@correo.com" }
            },
            "medico": {
                "id": 20,
                "nombre": "Andrés",
                "apellido": "Rojas"
            }
        })
    }

    pub fn english_appointment_response(id: &str, status: &str) -> Value {
        json!({
            "_id": id,
            "patient_id": "p-1",
            "doctor_id": "d-1",
            "date": "2025-03-15T14:00:00Z",
            "reason": "Follow up",
            "status": status
        })
    }

    pub fn data_envelope(items: Vec<Value>) -> Value {
        json!({ "success": true, "data": items })
    }

    pub fn entity_envelope(entity: Value) -> Value {
        json!({ "message": "Cita actualizada", "entity": entity })
    }

    pub fn error_response(message: &str) -> Value {
        json!({
            "success": false,
            "message": message
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::auth::Role;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.api_url, "http://localhost:3000/api");
        assert_eq!(app_config.api_token, "test-api-token");
        assert!(app_config.validates_tokens());
    }

    #[test]
    fn test_actor_creation() {
        let actor = TestActor::doctor();
        assert_eq!(actor.role, "médico");
        assert_eq!(actor.to_actor().role, Role::Doctor);
        assert_eq!(TestActor::admin().with_id("1").to_actor(), Actor::new("1", Role::Admin));
    }

    #[test]
    fn test_jwt_token_creation() {
        let token = JwtTestUtils::create_test_token(&TestActor::default(), "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }
}
