//! Signed, time-bounded session credentials.

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AuthError;
use super::models::Role;

/// Session validity window. Fixed, embedded in the token at issue time.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Signing keys that must never reach a running deployment. Startup rejects
/// them outright instead of falling back silently.
const PLACEHOLDER_KEYS: &[&str] = &[
    "",
    "changeme",
    "secret",
    "your-secret-key-change-in-production",
];

/// Claims embedded in every session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Account id.
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// Parse the subject claim back into an account id.
    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidSession)
    }
}

pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionIssuer {
    /// Build from the configured signing key.
    ///
    /// # Errors
    /// Fails when the key is absent or one of the known placeholder values,
    /// so a misconfigured deployment dies at startup rather than lazily
    /// inside a request handler.
    pub fn new(signing_key: &SecretString) -> Result<Self> {
        let key = signing_key.expose_secret();
        if PLACEHOLDER_KEYS.contains(&key) {
            bail!("session signing key is missing or a known placeholder");
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(key.as_bytes()),
            decoding: DecodingKey::from_secret(key.as_bytes()),
        })
    }

    /// Mint a signed session token for an authenticated account.
    pub fn issue(&self, account_id: Uuid, email: &str, role: Role) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: account_id.to_string(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).context("failed to sign session token")
    }

    /// Verify a presented token; signature mismatch and expiry both map to
    /// the same session error.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidSession)
    }
}
