use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::SessionKeys;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated principal resolved from the session token
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

/// Session middleware: resolves the principal and injects it into the request
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = resolve_session(
        request.headers(),
        &state.keys,
        &state.config.security.session_cookie,
    )?;

    tracing::debug!(user_id = %principal.user_id, "Session resolved");
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

/// Read-only: verifies the bearer token or session cookie
pub fn resolve_session(headers: &HeaderMap, keys: &SessionKeys, cookie_name: &str) -> Result<Principal, ApiError> {
    let token = bearer_token(headers)
        .or_else(|| cookie_token(headers, cookie_name))
        .ok_or_else(ApiError::not_authenticated)?;

    let claims = keys.verify(&token).map_err(|e| {
        tracing::debug!("Rejected session token: {}", e);
        ApiError::not_authenticated()
    })?;

    Ok(Principal {
        user_id: claims.sub,
        email: claims.email,
    })
}

/// Extract token from `Authorization: Bearer <token>`
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Extract token from the session cookie
fn cookie_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|t| !t.is_empty())
}
