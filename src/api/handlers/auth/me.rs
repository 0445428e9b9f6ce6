//! Authenticated profile read.

use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::instrument;

use crate::account::{AccountView, AuthError};

use super::state::AuthState;

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Profile of the authenticated account", body = AccountView),
        (status = 401, description = "Missing, malformed, or expired session token", body = String),
        (status = 404, description = "Account no longer exists", body = String),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(headers, auth_state))]
pub async fn me(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, AuthError> {
    let token = bearer_token(&headers).ok_or(AuthError::InvalidSession)?;
    let claims = auth_state.service().sessions().verify(token)?;
    let account_id = claims.account_id()?;

    match auth_state.service().me(account_id).await? {
        Some(view) => Ok(Json::<AccountView>(view).into_response()),
        // Valid token for a deleted account.
        None => Ok((StatusCode::NOT_FOUND, "Account not found".to_string()).into_response()),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
