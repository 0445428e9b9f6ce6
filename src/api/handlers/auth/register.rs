use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::instrument;

use crate::account::AuthError;

use super::state::AuthState;
use super::types::{MessageResponse, RegisterRequest};

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration accepted; a verification email was dispatched", body = MessageResponse),
        (status = 400, description = "Invalid email, missing name, or weak password", body = String),
        (status = 409, description = "Email already registered and verified", body = String),
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::Validation("Missing payload".to_string())),
    };

    let registered = auth_state
        .service()
        .register(&request.email, &request.password, &request.name)
        .await?;

    // Same body for fresh registration and unverified re-registration.
    let mut response = MessageResponse::new(
        "Registration successful. Check your email for a verification link.",
    );
    response.delivery_error = registered.delivery_error;
    Ok((StatusCode::CREATED, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::super::testing::auth_state;
    use super::{register, RegisterRequest};
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Json;

    #[tokio::test]
    async fn register_missing_payload() {
        let (state, _store, _mailer) = auth_state();
        let response = register(Extension(state), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_creates_account_and_sends_email() {
        let (state, store, mailer) = auth_state();
        let response = register(
            Extension(state),
            Some(Json(RegisterRequest {
                email: "Alice@Example.com".to_string(),
                password: "Str0ng!pass".to_string(),
                name: "Alice".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(store.account_count().await, 1);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice@example.com");
        assert!(sent[0].1.contains("/auth/verify-email?token="));
    }

    #[tokio::test]
    async fn register_weak_password_rejected() {
        let (state, store, _mailer) = auth_state();
        let response = register(
            Extension(state),
            Some(Json(RegisterRequest {
                email: "bob@example.com".to_string(),
                password: "short".to_string(),
                name: "Bob".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.account_count().await, 0);
    }
}
