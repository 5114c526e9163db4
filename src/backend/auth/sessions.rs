//! Session Tokens
//!
//! JWT verification for the real-time handshake and the REST bearer
//! middleware. Token issuance belongs to the external auth service;
//! `create_token` exists so tests and tooling can mint valid tokens
//! against the same secret.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::shared::error::ChatError;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Get JWT secret from environment
fn get_jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set, using development default");
        "ripple-dev-secret-change-in-production".to_string()
    })
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Create a JWT token for a user. Tokens expire after 30 days.
pub fn create_token(user_id: Uuid) -> Result<String, jsonwebtoken::errors::Error> {
    let now = unix_now();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 30 * 24 * 60 * 60,
        iat: now,
    };

    let secret = get_jwt_secret();
    let key = EncodingKey::from_secret(secret.as_ref());
    encode(&Header::default(), &claims, &key)
}

/// Verify a token and extract the user it identifies.
///
/// Any decode failure (bad signature, expired, malformed subject) maps
/// to [`ChatError::Auth`]; the raw jsonwebtoken error never crosses a
/// component boundary.
pub fn verify_token(token: &str) -> Result<Uuid, ChatError> {
    let secret = get_jwt_secret();
    let key = DecodingKey::from_secret(secret.as_ref());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &key, &validation)?;
    Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| ChatError::auth("invalid user id in token"))
}
