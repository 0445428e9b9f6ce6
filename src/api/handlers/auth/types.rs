//! Request and response payloads for the auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::account::AccountView;

#[derive(ToSchema, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct GoogleLoginRequest {
    /// Authorization code obtained from Google's consent redirect.
    pub code: String,
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(ToSchema, IntoParams, Deserialize, Debug)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

#[derive(ToSchema, Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
    #[serde(rename = "deliveryError", skip_serializing_if = "Option::is_none")]
    pub delivery_error: Option<String>,
}

impl MessageResponse {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            delivery_error: None,
        }
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct TokenResponse {
    pub token: String,
    pub user: AccountView,
}
