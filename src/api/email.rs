//! Outbound verification email delivery.
//!
//! Delivery is a trait so the lifecycle controller and the tests never
//! depend on a live provider. Failures propagate to the caller; there is no
//! retry queue, the user re-requests the link instead.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_verification(
        &self,
        to: &str,
        display_name: &str,
        verify_url: &str,
    ) -> Result<()>;
}

/// Logs the verification link instead of sending it. Default when no
/// delivery endpoint is configured; useful in development.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_verification(
        &self,
        to: &str,
        _display_name: &str,
        verify_url: &str,
    ) -> Result<()> {
        info!(%to, %verify_url, "email delivery disabled, logging verification link");
        Ok(())
    }
}

#[derive(Serialize)]
struct VerificationMessage<'a> {
    to: &'a str,
    subject: &'a str,
    display_name: &'a str,
    verify_url: &'a str,
}

/// Posts the verification message as JSON to a delivery endpoint.
pub struct HttpEmailSender {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEmailSender {
    pub fn new(endpoint: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(SEND_TIMEOUT)
            .build()
            .context("building email delivery client")?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send_verification(
        &self,
        to: &str,
        display_name: &str,
        verify_url: &str,
    ) -> Result<()> {
        let message = VerificationMessage {
            to,
            subject: "Verify your email address",
            display_name,
            verify_url,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&message)
            .send()
            .await
            .context("sending verification email")?;
        if !response.status().is_success() {
            anyhow::bail!(
                "email delivery endpoint returned {}",
                response.status()
            );
        }
        info!(%to, "verification email dispatched");
        Ok(())
    }
}
