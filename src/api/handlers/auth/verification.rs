//! Email verification endpoints.
//!
//! `GET /auth/verify-email` is opened from an email client, so it never
//! answers with JSON; every outcome becomes a redirect to the frontend
//! result page. `POST /auth/resend-verification` answers the same body for
//! every input to keep registered addresses unguessable.

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Redirect},
    Json,
};
use std::sync::Arc;
use tracing::{error, instrument};
use url::form_urlencoded;

use crate::account::{AuthError, VerifyOutcome};

use super::state::AuthState;
use super::types::{MessageResponse, ResendVerificationRequest, VerifyEmailQuery};

const RESULT_PAGE: &str = "verify-email-result";

#[utoipa::path(
    get,
    path = "/auth/verify-email",
    params(VerifyEmailQuery),
    responses(
        (status = 303, description = "Redirect to the frontend result page with status success, already-verified, expired, or error"),
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, query))]
pub async fn verify_email(
    auth_state: Extension<Arc<AuthState>>,
    query: Query<VerifyEmailQuery>,
) -> impl IntoResponse {
    let frontend = auth_state.frontend_base_url();
    let Some(token) = query.token.as_deref() else {
        return Redirect::to(&result_url(frontend, "error", None));
    };

    match auth_state.service().verify_email(token).await {
        Ok(VerifyOutcome::Verified) => Redirect::to(&result_url(frontend, "success", None)),
        Ok(VerifyOutcome::AlreadyVerified) => {
            Redirect::to(&result_url(frontend, "already-verified", None))
        }
        Ok(VerifyOutcome::Expired { email }) => {
            // The email rides along so the result page can offer a resend.
            Redirect::to(&result_url(frontend, "expired", Some(&email)))
        }
        Ok(VerifyOutcome::NotFound) => Redirect::to(&result_url(frontend, "error", None)),
        Err(err) => {
            error!("Email verification failed: {err}");
            Redirect::to(&result_url(frontend, "error", None))
        }
    }
}

#[utoipa::path(
    post,
    path = "/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Accepted; answered identically whether or not the address is registered", body = MessageResponse),
        (status = 400, description = "Missing payload or email", body = String),
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn resend_verification(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResendVerificationRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request: ResendVerificationRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::Validation("Missing payload".to_string())),
    };
    if request.email.trim().is_empty() {
        return Err(AuthError::Validation("Missing email".to_string()));
    }

    auth_state
        .service()
        .resend_verification(&request.email)
        .await?;

    // One body for every outcome.
    Ok(Json(MessageResponse::new(
        "If that address has an unverified account, a new verification email is on its way.",
    )))
}

fn result_url(frontend_base_url: &str, status: &str, email: Option<&str>) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("status", status);
    if let Some(email) = email {
        query.append_pair("email", email);
    }
    format!("{base}/{RESULT_PAGE}?{}", query.finish())
}
