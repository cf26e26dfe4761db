use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::session::Session,
};

/// A helper function to map a `tokio_postgres::Row` to a `Session`.
fn row_to_session(row: &Row) -> Result<Session> {
    Ok(Session {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        token_hash: row.try_get("token_hash")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

/// Creates a session row for a freshly issued refresh token.
pub async fn create(
    pool: &Pool,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<Session> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO sessions (id, user_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_hash, expires_at, created_at, revoked_at
            "#,
            &[&Uuid::new_v4(), &user_id, &token_hash, &expires_at],
        )
        .await?;
    row_to_session(&row)
}

/// Finds the active session for a refresh-token fingerprint.
///
/// Revoked and expired rows are excluded at read time.
pub async fn find_active_by_hash(pool: &Pool, token_hash: &str) -> Result<Option<Session>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, user_id, token_hash, expires_at, created_at, revoked_at
            FROM sessions
            WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > NOW()
            "#,
            &[&token_hash],
        )
        .await?;
    row.map(|r| row_to_session(&r)).transpose()
}

/// Revokes a single session. Returns whether a row was actually revoked;
/// revoking an already-revoked session is a no-op, which keeps the call
/// safe to retry.
pub async fn revoke(pool: &Pool, session_id: Uuid) -> Result<bool> {
    let client = pool.get().await?;
    let affected = client
        .execute(
            r#"
            UPDATE sessions
            SET revoked_at = NOW()
            WHERE id = $1 AND revoked_at IS NULL
            "#,
            &[&session_id],
        )
        .await?;
    Ok(affected > 0)
}

/// Revokes every active session belonging to a user.
pub async fn revoke_all_for_user(pool: &Pool, user_id: Uuid) -> Result<u64> {
    let client = pool.get().await?;
    let affected = client
        .execute(
            r#"
            UPDATE sessions
            SET revoked_at = NOW()
            WHERE user_id = $1 AND revoked_at IS NULL
            "#,
            &[&user_id],
        )
        .await?;
    Ok(affected)
}

/// Atomically rotates a session: revokes the consumed one and inserts
/// its replacement in a single transaction.
///
/// The revoke is conditional on the row still being active, so of two
/// concurrent rotations on the same session exactly one wins; the loser
/// gets `SessionAlreadyRevoked` and must re-authenticate.
pub async fn rotate(
    pool: &Pool,
    session_id: Uuid,
    user_id: Uuid,
    new_token_hash: &str,
    new_expires_at: DateTime<Utc>,
) -> Result<Session> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let revoked = tx
        .execute(
            r#"
            UPDATE sessions
            SET revoked_at = NOW()
            WHERE id = $1 AND revoked_at IS NULL AND expires_at > NOW()
            "#,
            &[&session_id],
        )
        .await?;

    if revoked == 0 {
        // Dropping the transaction rolls it back.
        return Err(AppError::SessionAlreadyRevoked);
    }

    let row = tx
        .query_one(
            r#"
            INSERT INTO sessions (id, user_id, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, token_hash, expires_at, created_at, revoked_at
            "#,
            &[&Uuid::new_v4(), &user_id, &new_token_hash, &new_expires_at],
        )
        .await?;

    tx.commit().await?;
    row_to_session(&row)
}

/// Deletes rows that can no longer authenticate anything. Run
/// periodically; correctness never depends on it because expiry is
/// checked at read time and encoded in the token itself.
pub async fn purge_expired(pool: &Pool) -> Result<u64> {
    let client = pool.get().await?;
    let affected = client
        .execute(
            r#"
            DELETE FROM sessions
            WHERE expires_at <= NOW() OR revoked_at IS NOT NULL
            "#,
            &[],
        )
        .await?;
    Ok(affected)
}
