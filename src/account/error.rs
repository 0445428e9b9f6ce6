//! Error taxonomy for account operations.
//!
//! Every variant maps to a stable HTTP status and a user-safe message;
//! internal detail is logged, never returned to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// Registration password fails the policy; carries the unmet rule.
    #[error("password too weak: {0}")]
    WeakPassword(&'static str),

    #[error("email already registered")]
    EmailAlreadyRegistered,

    /// Deliberately conflates unknown email, OAuth-only accounts, and a wrong
    /// password so responses do not reveal which one it was.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Distinct from `InvalidCredentials` so clients can offer a resend action.
    #[error("email not verified")]
    EmailNotVerified,

    /// Authorization code exchange with the provider failed.
    #[error("oauth exchange failed: {0}")]
    OAuthExchange(String),

    #[error("invalid or expired session")]
    InvalidSession,

    /// The verification email could not be dispatched. The account state
    /// change that preceded it has already committed and is not rolled back.
    #[error("verification email dispatch failed: {0}")]
    Delivery(String),

    /// Persistence layer unavailable; fatal for the current request.
    #[error("persistence failure")]
    Store(#[from] anyhow::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Validation(message) => {
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            Self::WeakPassword(rule) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": format!("Password too weak: {rule}") }),
            ),
            Self::EmailAlreadyRegistered => (
                StatusCode::CONFLICT,
                json!({ "message": "Email already registered" }),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Invalid credentials" }),
            ),
            Self::EmailNotVerified => (
                StatusCode::FORBIDDEN,
                json!({ "message": "Email not verified", "code": "EMAIL_NOT_VERIFIED" }),
            ),
            Self::OAuthExchange(detail) => {
                // Provider error bodies stay in the logs.
                warn!("oauth exchange failed: {detail}");
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "message": "Invalid authorization code" }),
                )
            }
            Self::InvalidSession => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Invalid or expired session" }),
            ),
            Self::Delivery(detail) => {
                warn!("verification email dispatch failed: {detail}");
                (
                    StatusCode::BAD_GATEWAY,
                    json!({
                        "message":
                            "Account saved but the verification email could not be sent. \
                             Request a new link via resend-verification."
                    }),
                )
            }
            Self::Store(err) => {
                error!("account store failure: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
