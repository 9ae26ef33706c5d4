use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_models::auth::{normalize_role, Actor, IdentityProvider};

use crate::jwt::{validate_token, JwtError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    #[error("Login response is missing '{0}'")]
    MissingField(&'static str),
}

/// The authenticated actor plus the credential sent with every gateway call.
///
/// The role is normalized here, once; everything downstream sees only `Role`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    actor: Actor,
    token: Option<String>,
}

impl Session {
    pub fn new(actor: Actor, token: Option<String>) -> Self {
        Self { actor, token }
    }

    /// Verify an HS256 bearer token and derive the actor from its claims.
    pub fn from_token(token: &str, jwt_secret: &str) -> Result<Self, SessionError> {
        let user = validate_token(token, jwt_secret)?;
        let actor = user.to_actor();
        info!("Session established for {} ({})", actor.id, actor.role);

        Ok(Self::new(actor, Some(token.to_string())))
    }

    /// Accepts `{data: {token, user}}` or a bare `{token, user}`.
    pub fn from_login_response(response: &Value) -> Result<Self, SessionError> {
        let data = response.get("data").filter(|d| d.is_object()).unwrap_or(response);

        let token = data
            .get("token")
            .and_then(Value::as_str)
            .ok_or(SessionError::MissingField("token"))?;
        let user = data.get("user").ok_or(SessionError::MissingField("user"))?;

        let id = match user.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(SessionError::MissingField("user.id")),
        };
        let raw_role = user
            .get("rol")
            .or_else(|| user.get("role"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        debug!("Login response for user {} with role '{}'", id, raw_role);
        Ok(Self::new(Actor::new(id, normalize_role(raw_role)), Some(token.to_string())))
    }

    /// Build the session the binary runs as: token claims when a secret is configured,
    /// otherwise the actor named by the environment.
    pub fn from_config(config: &AppConfig) -> Result<Self, SessionError> {
        let token = Some(config.api_token.clone()).filter(|t| !t.is_empty());

        if config.validates_tokens() {
            return Self::from_token(&config.api_token, &config.jwt_secret);
        }

        if config.actor_id.is_empty() {
            return Err(SessionError::MissingField("CLINIC_ACTOR_ID"));
        }

        Ok(Self::new(
            Actor::new(config.actor_id.clone(), normalize_role(&config.actor_role)),
            token,
        ))
    }
}

impl IdentityProvider for Session {
    fn actor(&self) -> &Actor {
        &self.actor
    }

    fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
