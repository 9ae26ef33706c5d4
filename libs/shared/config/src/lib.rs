use std::env;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_url: String,
    pub api_token: String,
    pub jwt_secret: String,
    pub actor_id: String,
    pub actor_role: String,
    pub use_status_endpoints: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_url: env::var("CLINIC_API_URL")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_API_URL not set, using default");
                    DEFAULT_API_URL.to_string()
                }),
            api_token: env::var("CLINIC_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_API_TOKEN not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("CLINIC_JWT_SECRET").unwrap_or_default(),
            actor_id: env::var("CLINIC_ACTOR_ID").unwrap_or_default(),
            actor_role: env::var("CLINIC_ACTOR_ROLE").unwrap_or_default(),
            use_status_endpoints: env::var("CLINIC_STATUS_ENDPOINTS")
                .map(|value| parse_flag(&value))
                .unwrap_or(false),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty() && !self.api_token.is_empty()
    }

    /// True when the bearer token should be verified locally and the actor read from its claims.
    pub fn validates_tokens(&self) -> bool {
        !self.jwt_secret.is_empty()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
