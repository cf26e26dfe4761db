use uuid::Uuid;
use crate::{
    crypto::password,
    crypto::token::{self, TokenKind},
    error::{AppError, Result},
    models::user::User,
    repositories::session as session_repo,
    repositories::user as user_repo,
    state::AppState,
    validation::auth::{validate_email, validate_password},
};

/// Tokens issued on registration and login, with the subject attached.
pub struct AuthTokens {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Tokens issued on refresh; the subject is already known to the caller.
pub struct RotatedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Issues an access/refresh pair for `user` and persists the session row
/// backing the refresh token.
async fn open_session(state: &AppState, user: User) -> Result<AuthTokens> {
    let access = state
        .tokens
        .issue(user.id, TokenKind::Access)
        .map_err(|e| AppError::Internal(format!("Token issuance failed: {}", e)))?;
    let refresh = state
        .tokens
        .issue(user.id, TokenKind::Refresh)
        .map_err(|e| AppError::Internal(format!("Token issuance failed: {}", e)))?;

    session_repo::create(
        &state.db,
        user.id,
        &token::fingerprint(&refresh.token),
        refresh.expires_at,
    )
    .await?;

    Ok(AuthTokens {
        user,
        access_token: access.token,
        refresh_token: refresh.token,
        expires_in: state.tokens.access_ttl_seconds(),
    })
}

/// Runs the deliberately slow Argon2 work off the request path.
async fn hash_blocking(password_plain: String) -> Result<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&password_plain))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
}

async fn verify_blocking(password_plain: String, digest: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&password_plain, &digest))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))
}

/// Registers a new user and logs them in.
///
/// Input is validated before storage is touched. A duplicate email is
/// surfaced explicitly as `EmailAlreadyRegistered`.
pub async fn register(state: &AppState, email: String, password_plain: String) -> Result<AuthTokens> {
    validate_email(&email)?;
    validate_password(&password_plain)?;

    let password_hash = hash_blocking(password_plain).await?;
    let user = user_repo::create(&state.db, Uuid::new_v4(), &email, &password_hash).await?;

    tracing::info!("✅ User registered: {}", user.id);
    open_session(state, user).await
}

/// Authenticates a user and opens a new session.
///
/// Unknown email and wrong password are indistinguishable to the caller:
/// both return `InvalidCredentials`, and the unknown-email path still
/// performs a full Argon2 verification against a dummy digest so the two
/// cannot be told apart by timing.
pub async fn login(state: &AppState, email: String, password_plain: String) -> Result<AuthTokens> {
    let user = user_repo::find_by_email(&state.db, &email).await?;

    match user {
        Some(user) => {
            let digest = user.password_hash.clone();
            if !verify_blocking(password_plain, digest).await? {
                return Err(AppError::InvalidCredentials);
            }

            tracing::info!("✅ User logged in: {}", user.id);
            open_session(state, user).await
        }
        None => {
            let _ = verify_blocking(password_plain, password::DUMMY_HASH.to_string()).await;
            Err(AppError::InvalidCredentials)
        }
    }
}

/// Exchanges a refresh token for a new access/refresh pair, rotating the
/// backing session.
///
/// The consumed token can never be used again: its session row is
/// revoked in the same transaction that creates the replacement, so a
/// replayed token finds the session gone and fails with `SessionExpired`.
pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<RotatedTokens> {
    let claims = state
        .tokens
        .decode(refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            tracing::debug!("Refresh token rejected: {}", e);
            AppError::SessionExpired
        })?;

    let session = session_repo::find_active_by_hash(&state.db, &token::fingerprint(refresh_token))
        .await?
        .ok_or(AppError::SessionExpired)?;

    // The token and its session row must agree on the subject.
    if session.user_id != claims.sub {
        tracing::warn!("Refresh token subject does not match session owner");
        return Err(AppError::SessionExpired);
    }

    let new_refresh = state
        .tokens
        .issue(session.user_id, TokenKind::Refresh)
        .map_err(|e| AppError::Internal(format!("Token issuance failed: {}", e)))?;

    session_repo::rotate(
        &state.db,
        session.id,
        session.user_id,
        &token::fingerprint(&new_refresh.token),
        new_refresh.expires_at,
    )
    .await?;

    let access = state
        .tokens
        .issue(session.user_id, TokenKind::Access)
        .map_err(|e| AppError::Internal(format!("Token issuance failed: {}", e)))?;

    tracing::debug!("🔄 Session rotated for user: {}", session.user_id);

    Ok(RotatedTokens {
        access_token: access.token,
        refresh_token: new_refresh.token,
        expires_in: state.tokens.access_ttl_seconds(),
    })
}

/// Fetches the authenticated subject's account.
///
/// A valid token whose account has since disappeared is unauthorized,
/// not a missing resource.
pub async fn current_user(state: &AppState, user_id: Uuid) -> Result<User> {
    user_repo::find_by_id(&state.db, &user_id)
        .await?
        .ok_or(AppError::Unauthorized)
}

/// Revokes every active session for a user, logging out all devices.
pub async fn logout_all(state: &AppState, user_id: Uuid) -> Result<u64> {
    let revoked = session_repo::revoke_all_for_user(&state.db, user_id).await?;
    tracing::info!("👋 Revoked {} sessions for user: {}", revoked, user_id);
    Ok(revoked)
}

/// Logs out by revoking the session behind a refresh token.
///
/// Idempotent by design: an undecodable token, or one whose session is
/// already gone, is treated as already logged out.
pub async fn logout(state: &AppState, refresh_token: &str) -> Result<()> {
    let Ok(_claims) = state.tokens.decode(refresh_token, TokenKind::Refresh) else {
        return Ok(());
    };

    if let Some(session) =
        session_repo::find_active_by_hash(&state.db, &token::fingerprint(refresh_token)).await?
    {
        session_repo::revoke(&state.db, session.id).await?;
        tracing::info!("👋 User logged out: {}", session.user_id);
    }

    Ok(())
}
