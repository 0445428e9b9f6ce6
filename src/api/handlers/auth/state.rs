//! Auth configuration and shared handler state.

use secrecy::SecretString;
use std::sync::Arc;

use crate::account::AccountService;

#[derive(Clone)]
pub struct AuthConfig {
    public_base_url: String,
    frontend_base_url: String,
    session_signing_key: SecretString,
    google_client_id: String,
    google_client_secret: SecretString,
    google_redirect_uri: String,
    email_endpoint: Option<String>,
}

impl AuthConfig {
    #[must_use]
    pub fn new(
        public_base_url: String,
        frontend_base_url: String,
        session_signing_key: SecretString,
        google_client_id: String,
        google_client_secret: SecretString,
        google_redirect_uri: String,
    ) -> Self {
        Self {
            public_base_url,
            frontend_base_url,
            session_signing_key,
            google_client_id,
            google_client_secret,
            google_redirect_uri,
            email_endpoint: None,
        }
    }

    #[must_use]
    pub fn with_email_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.email_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn session_signing_key(&self) -> &SecretString {
        &self.session_signing_key
    }

    #[must_use]
    pub fn google_client_id(&self) -> &str {
        &self.google_client_id
    }

    #[must_use]
    pub fn google_client_secret(&self) -> &SecretString {
        &self.google_client_secret
    }

    #[must_use]
    pub fn google_redirect_uri(&self) -> &str {
        &self.google_redirect_uri
    }

    #[must_use]
    pub fn email_endpoint(&self) -> Option<&str> {
        self.email_endpoint.as_deref()
    }
}

/// Shared state injected into the auth handlers via `Extension`.
pub struct AuthState {
    service: Arc<AccountService>,
    frontend_base_url: String,
}

impl AuthState {
    #[must_use]
    pub fn new(service: Arc<AccountService>, frontend_base_url: String) -> Self {
        Self {
            service,
            frontend_base_url,
        }
    }

    #[must_use]
    pub fn service(&self) -> &AccountService {
        &self.service
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }
}
