use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    crypto::token::TokenKind,
    error::AppError,
    state::AppState,
};

/// The authenticated subject for the current request.
///
/// Produced only by `require_auth`; resource handlers take the owner id
/// from here and nowhere else.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// A middleware that requires a valid access token.
///
/// Fails closed: missing header, malformed scheme, and every decode
/// failure produce the same 401; which check failed is only logged
/// server-side. A refresh token presented here is rejected by the kind
/// check.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer(request.headers()).ok_or_else(|| {
        tracing::debug!("❌ Missing or malformed Authorization header");
        AppError::Unauthorized
    })?;

    let claims = state
        .tokens
        .decode(token, TokenKind::Access)
        .map_err(|e| {
            tracing::warn!("❌ Access token rejected: {}", e);
            AppError::Unauthorized
        })?;

    request.extensions_mut().insert(CurrentUser { id: claims.sub });

    Ok(next.run(request).await)
}
