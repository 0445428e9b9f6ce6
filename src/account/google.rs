//! Google OAuth authorization-code exchange.
//!
//! The exchange is two hops: trade the code for tokens at the token endpoint,
//! then have Google's tokeninfo endpoint validate the `id_token` signature and
//! echo its claims. The audience must match our registered client id and both
//! `sub` and `email` must be present; anything short of that is a hard
//! failure, never a default-filled identity.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::AuthError;

const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const TOKENINFO_ENDPOINT: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Upper bound on each provider round trip.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity assertion obtained from the provider.
#[derive(Debug, Clone)]
pub struct OAuthIdentity {
    pub subject_id: String,
    pub email: String,
    pub display_name: String,
}

/// Exchange an authorization code for a verified identity assertion.
#[async_trait]
pub trait IdentityExchanger: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<OAuthIdentity, AuthError>;
}

pub struct GoogleExchanger {
    client: Client,
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenInfo {
    aud: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

impl GoogleExchanger {
    /// Build the HTTP client once; credentials come from startup configuration.
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        redirect_uri: String,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(EXCHANGE_TIMEOUT)
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .map_err(|err| anyhow::anyhow!("failed to build OAuth HTTP client: {err}"))?;
        Ok(Self {
            client,
            client_id,
            client_secret,
            redirect_uri,
        })
    }
}

#[async_trait]
impl IdentityExchanger for GoogleExchanger {
    async fn exchange_code(&self, code: &str) -> Result<OAuthIdentity, AuthError> {
        let form = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&form)
            .send()
            .await
            .map_err(|err| AuthError::OAuthExchange(format!("token endpoint unreachable: {err}")))?;
        if !response.status().is_success() {
            return Err(AuthError::OAuthExchange(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| AuthError::OAuthExchange(format!("invalid token response: {err}")))?;
        let id_token = token.id_token.ok_or_else(|| {
            AuthError::OAuthExchange("provider response carried no id_token".to_string())
        })?;

        // tokeninfo rejects bad signatures and expired assertions server-side
        // and returns the claims on success.
        let response = self
            .client
            .get(TOKENINFO_ENDPOINT)
            .query(&[("id_token", id_token.as_str())])
            .send()
            .await
            .map_err(|err| {
                AuthError::OAuthExchange(format!("tokeninfo endpoint unreachable: {err}"))
            })?;
        if !response.status().is_success() {
            return Err(AuthError::OAuthExchange(format!(
                "tokeninfo rejected the assertion: {}",
                response.status()
            )));
        }
        let info: TokenInfo = response
            .json()
            .await
            .map_err(|err| AuthError::OAuthExchange(format!("invalid tokeninfo response: {err}")))?;

        verify_assertion(&self.client_id, info)
    }
}

/// Enforce the assertion requirements: our audience, and a present subject
/// and email. The display name may fall back to the email's local part.
fn verify_assertion(client_id: &str, info: TokenInfo) -> Result<OAuthIdentity, AuthError> {
    if info.aud.as_deref() != Some(client_id) {
        return Err(AuthError::OAuthExchange(
            "assertion audience does not match our client id".to_string(),
        ));
    }
    let subject_id = info
        .sub
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| AuthError::OAuthExchange("assertion carried no subject".to_string()))?;
    let email = info
        .email
        .filter(|email| !email.is_empty())
        .ok_or_else(|| AuthError::OAuthExchange("assertion carried no email".to_string()))?;
    let display_name = info
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    Ok(OAuthIdentity {
        subject_id,
        email,
        display_name,
    })
}
