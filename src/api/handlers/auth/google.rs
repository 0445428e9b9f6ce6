use axum::{extract::Extension, response::IntoResponse, Json};
use std::sync::Arc;
use tracing::instrument;

use crate::account::AuthError;

use super::state::AuthState;
use super::types::{GoogleLoginRequest, TokenResponse};

#[utoipa::path(
    post,
    path = "/auth/google",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Authorization code rejected by the provider", body = String),
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn google_login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<GoogleLoginRequest>>,
) -> Result<impl IntoResponse, AuthError> {
    let request: GoogleLoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return Err(AuthError::Validation("Missing payload".to_string())),
    };

    let authenticated = auth_state.service().oauth_login(&request.code).await?;

    Ok(Json(TokenResponse {
        token: authenticated.token,
        user: authenticated.user,
    }))
}

#[cfg(test)]
mod tests {
    use super::super::testing::auth_state;
    use super::{google_login, GoogleLoginRequest};
    use crate::account::AccountStore;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Json;

    #[tokio::test]
    async fn google_login_creates_verified_account() {
        let (state, store, _mailer) = auth_state();
        let response = google_login(
            Extension(state),
            Some(Json(GoogleLoginRequest {
                code: "good-code".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(store.account_count().await, 1);

        let account = store
            .find_by_email("oauth@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(account.verification.is_verified());
    }

    #[tokio::test]
    async fn google_login_bad_code_rejected() {
        let (state, store, _mailer) = auth_state();
        let response = google_login(
            Extension(state),
            Some(Json(GoogleLoginRequest {
                code: "bad-code".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.account_count().await, 0);
    }
}
