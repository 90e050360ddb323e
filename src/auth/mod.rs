use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Default token lifetime
pub const DEFAULT_TOKEN_TTL_HOURS: u64 = 24;

/// Longest accepted token lifetime; larger settings are clamped
pub const MAX_TOKEN_TTL_HOURS: u64 = 24 * 366;

/// Session token claims. Only `authenticated` and `exp` are checked downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub authenticated: bool,
    /// Issue time in milliseconds since the epoch
    pub timestamp: i64,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(ttl_hours: u64) -> Self {
        let now = Utc::now();
        let hours = ttl_hours.min(MAX_TOKEN_TTL_HOURS) as i64;
        let exp = (now + Duration::hours(hours)).timestamp();

        Self {
            authenticated: true,
            timestamp: now.timestamp_millis(),
            iat: now.timestamp(),
            exp,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("password does not match")]
    InvalidCredentials,

    #[error("missing configuration: {0}")]
    ServerMisconfigured(&'static str),

    #[error("missing or non-bearer Authorization header")]
    MissingToken,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token generation failed: {0}")]
    TokenGeneration(String),
}

/// Exchange the shared dashboard password for a signed session token
pub fn issue_token(
    password: &str,
    expected_password: Option<&str>,
    secret: Option<&str>,
    ttl_hours: u64,
) -> Result<String, AuthError> {
    let expected = expected_password
        .filter(|p| !p.is_empty())
        .ok_or(AuthError::ServerMisconfigured("DASHBOARD_PASSWORD"))?;
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::ServerMisconfigured("JWT_SECRET"))?;

    if !passwords_match(password, expected) {
        return Err(AuthError::InvalidCredentials);
    }

    sign(&Claims::new(ttl_hours), secret)
}

/// Sign arbitrary claims with the shared secret (HS256)
pub fn sign(claims: &Claims, secret: &str) -> Result<String, AuthError> {
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Validate a raw `Authorization` header value and return the token claims
pub fn verify_token(bearer_header: Option<&str>, secret: &str) -> Result<Claims, AuthError> {
    let token = bearer_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken(e.to_string()),
    })?;

    if !token_data.claims.authenticated {
        return Err(AuthError::InvalidToken("token is not an authenticated session".to_string()));
    }

    Ok(token_data.claims)
}

// Compare digests so the work done does not depend on where the inputs diverge
fn passwords_match(given: &str, expected: &str) -> bool {
    let given = Sha256::digest(given.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());

    given
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
