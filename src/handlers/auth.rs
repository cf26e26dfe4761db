use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::CurrentUser,
    models::user::User,
    services::auth as auth_service,
    state::AppState,
};

/// The request payload for user registration.
#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// The request payload for user login.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The request payload for token refresh and logout.
#[derive(Deserialize, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// The subject as exposed to clients. The password hash never leaves
/// the service layer.
fn user_json(user: &User) -> sonic_rs::Value {
    sonic_rs::json!({
        "id": user.id.to_string(),
        "email": user.email,
        "created_at": user.created_at.to_rfc3339(),
        "updated_at": user.updated_at.to_rfc3339()
    })
}

fn token_body(tokens: &auth_service::AuthTokens) -> Result<String> {
    sonic_rs::to_string(&sonic_rs::json!({
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
        "token_type": "bearer",
        "expires_in": tokens.expires_in,
        "user": user_json(&tokens.user)
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response> {
    tracing::info!("📝 Register attempt");

    let tokens = auth_service::register(&state, payload.email, payload.password).await?;

    Ok((StatusCode::CREATED, token_body(&tokens)?).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    tracing::info!("🔐 Login attempt");

    let tokens = auth_service::login(&state, payload.email, payload.password).await?;

    Ok((StatusCode::OK, token_body(&tokens)?).into_response())
}

/// Exchanges a refresh token for a new token pair.
#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Response> {
    let rotated = auth_service::refresh(&state, &payload.refresh_token).await?;

    let body = sonic_rs::to_string(&sonic_rs::json!({
        "access_token": rotated.access_token,
        "refresh_token": rotated.refresh_token,
        "token_type": "bearer",
        "expires_in": rotated.expires_in
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Returns the authenticated user's profile.
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response> {
    let user = auth_service::current_user(&state, user.id).await?;

    let body = sonic_rs::to_string(&user_json(&user))
        .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Revokes every session for the authenticated user, across devices.
#[axum::debug_handler]
pub async fn logout_all(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response> {
    auth_service::logout_all(&state, user.id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Handles user logout. Always 204: logging out with a consumed or
/// garbage token is a success, not an error.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Response> {
    auth_service::logout(&state, &payload.refresh_token).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
