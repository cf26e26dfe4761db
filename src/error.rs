use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tokio_postgres::error::SqlState;

/// The application's error type.
///
/// Every failure that crosses the HTTP boundary is expressed as one of
/// these variants; raw driver or crypto errors never escape.
#[derive(Error, Debug)]
pub enum AppError {
    /// A database error.
    #[error("Database error: {0}")]
    Database(tokio_postgres::Error),

    /// The storage backend could not be reached in time. Safe to retry.
    #[error("Storage unavailable")]
    StorageUnavailable,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Login failed. Covers both unknown email and wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Registration with an email that already has an account.
    #[error("Email already registered")]
    EmailAlreadyRegistered,

    /// Missing, malformed, or expired access token.
    #[error("Unauthorized")]
    Unauthorized,

    /// The refresh chain is invalid or consumed. Client must re-login.
    #[error("Session expired")]
    SessionExpired,

    /// Lost the rotation race on a session that was concurrently consumed.
    #[error("Session already revoked")]
    SessionAlreadyRevoked,

    /// A resource not found error. Also covers rows owned by someone else.
    #[error("Resource not found")]
    NotFound,

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Whether a SQLSTATE marks a query that was cut off by a timeout.
///
/// `statement_timeout` cancels the statement server-side, which the
/// driver reports as `QUERY_CANCELED`. That is a bounded-wait failure
/// like a pool timeout, so it must surface as retryable, not as a
/// generic database error.
fn is_timeout_sqlstate(code: Option<&SqlState>) -> bool {
    code == Some(&SqlState::QUERY_CANCELED)
}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        if is_timeout_sqlstate(err.code()) {
            AppError::StorageUnavailable
        } else {
            AppError::Database(err)
        }
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        use deadpool_postgres::PoolError;

        match err {
            PoolError::Timeout(_) => AppError::StorageUnavailable,
            PoolError::Backend(e) => AppError::from(e),
            PoolError::Closed => AppError::StorageUnavailable,
            other => AppError::Internal(format!("Pool error: {}", other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // 401 and 404 bodies must be structurally identical regardless of
        // which check failed, so the message per status is fixed here and
        // the underlying cause only goes to the server log.
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::StorageUnavailable => {
                tracing::warn!("Storage unavailable, request failed");
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable".to_string())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::UNPROCESSABLE_ENTITY, msg.clone())
            }

            AppError::InvalidCredentials => {
                tracing::warn!("Login failed");
                (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string())
            }

            AppError::EmailAlreadyRegistered => {
                tracing::debug!("Registration with existing email");
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }

            AppError::Unauthorized => {
                tracing::warn!("Unauthorized request");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string())
            }

            AppError::SessionExpired => {
                tracing::debug!("Refresh chain invalid or consumed");
                (StatusCode::UNAUTHORIZED, "Session expired, please log in again".to_string())
            }

            AppError::SessionAlreadyRevoked => {
                tracing::warn!("Rotation race lost, session already revoked");
                (StatusCode::UNAUTHORIZED, "Session expired, please log in again".to_string())
            }

            AppError::NotFound => {
                tracing::debug!("Resource not found");
                (StatusCode::NOT_FOUND, "Resource not found".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, body).into_response()
    }
}
