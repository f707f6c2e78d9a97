//! Bearer-token guard for the admin routes.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::errors::ServiceError;
use crate::webhooks::constant_time_eq;
use crate::AppState;

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Rejects requests whose bearer token does not match `admin_token`.
/// With no token configured every admin request is rejected.
pub async fn require_admin(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(expected) = state
        .config
        .admin_token
        .as_deref()
        .filter(|token| !token.trim().is_empty())
    else {
        warn!(uri = %request.uri(), "admin request rejected: no admin token configured");
        return ServiceError::Unauthorized("admin access is not configured".into()).into_response();
    };

    let authorized = bearer_token(&request).is_some_and(|token| constant_time_eq(expected, token));
    if !authorized {
        warn!(uri = %request.uri(), "admin request rejected: bad or missing bearer token");
        return ServiceError::Unauthorized("invalid admin token".into()).into_response();
    }

    next.run(request).await
}
