use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::instrument;

use crate::account::AuthError;

use super::state::AuthState;
use super::types::{LoginRequest, TokenResponse};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Unknown email or wrong password", body = String),
        (status = 403, description = "Email not verified", body = String),
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::Validation("Missing payload".to_string())),
    };

    let authenticated = auth_state
        .service()
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(TokenResponse {
        token: authenticated.token,
        user: authenticated.user,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::register::register;
    use super::super::testing::auth_state;
    use super::super::types::RegisterRequest;
    use super::{login, LoginRequest};
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Json;

    #[tokio::test]
    async fn login_unknown_email_is_unauthorized() {
        let (state, _store, _mailer) = auth_state();
        let response = login(
            Extension(state),
            Some(Json(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "Str0ng!pass".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_unverified_account_is_forbidden() {
        let (state, _store, _mailer) = auth_state();
        let created = register(
            Extension(state.clone()),
            Some(Json(RegisterRequest {
                email: "alice@example.com".to_string(),
                password: "Str0ng!pass".to_string(),
                name: "Alice".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(created.status(), StatusCode::CREATED);

        let response = login(
            Extension(state),
            Some(Json(LoginRequest {
                email: "alice@example.com".to_string(),
                password: "Str0ng!pass".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn login_wrong_password_beats_verification_gate() {
        let (state, _store, _mailer) = auth_state();
        let created = register(
            Extension(state.clone()),
            Some(Json(RegisterRequest {
                email: "alice@example.com".to_string(),
                password: "Str0ng!pass".to_string(),
                name: "Alice".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(created.status(), StatusCode::CREATED);

        // Wrong password on an unverified account must not reveal the
        // verification state.
        let response = login(
            Extension(state),
            Some(Json(LoginRequest {
                email: "alice@example.com".to_string(),
                password: "Wr0ng!pass!".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
