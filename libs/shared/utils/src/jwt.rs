use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum JwtError {
    #[error("JWT secret is not set")]
    MissingSecret,

    #[error("Invalid token format")]
    Malformed,

    #[error("Invalid token signature")]
    BadSignature,

    #[error("Invalid claims: {0}")]
    InvalidClaims(String),

    #[error("Token expired")]
    Expired,
}

/// Verify an HS256 token and return the user it was issued to.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, JwtError> {
    if jwt_secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(JwtError::Malformed);
    };

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        JwtError::BadSignature
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| JwtError::MissingSecret)?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());
    mac.verify_slice(&signature).map_err(|_| {
        debug!("Token signature verification failed");
        JwtError::BadSignature
    })?;

    let claims_bytes = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| JwtError::InvalidClaims("claims are not base64url".to_string()))?;
    let claims: JwtClaims = serde_json::from_slice(&claims_bytes)
        .map_err(|e| JwtError::InvalidClaims(e.to_string()))?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp().max(0) as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err(JwtError::Expired);
        }
    }

    let created_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    debug!("Token validated for user: {}", claims.sub);
    Ok(User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        metadata: claims.user_metadata,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::test_utils::{JwtTestUtils, TestActor};

    const SECRET: &str = "test-secret-key-for-jwt-validation-must-be-long-enough";

    #[test]
    fn test_valid_token_round_trip() {
        let actor = TestActor::doctor();
        let token = JwtTestUtils::create_test_token(&actor, SECRET, Some(1));

        let user = validate_token(&token, SECRET).unwrap();
        assert_eq!(user.id, actor.id);
        assert_eq!(user.role.as_deref(), Some("médico"));
    }

    #[test]
    fn test_rejections() {
        let actor = TestActor::patient();

        assert_matches!(validate_token("x.y.z", ""), Err(JwtError::MissingSecret));
        assert_matches!(validate_token("only.two", SECRET), Err(JwtError::Malformed));
        assert_matches!(
            validate_token(&JwtTestUtils::create_invalid_signature_token(&actor), SECRET),
            Err(JwtError::BadSignature)
        );
        assert_matches!(
            validate_token(&JwtTestUtils::create_expired_token(&actor, SECRET), SECRET),
            Err(JwtError::Expired)
        );
    }
}
