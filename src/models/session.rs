use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One row per issued refresh token.
///
/// Only the SHA-256 fingerprint of the token is stored, never the raw
/// value. A session stops being usable once `revoked_at` is set or
/// `expires_at` has passed; rotation revokes the old row and inserts a
/// replacement in one transaction.
#[derive(Clone, Debug)]
pub struct Session {
    /// The unique identifier for the session.
    pub id: Uuid,
    /// The ID of the user this session belongs to.
    pub user_id: Uuid,
    /// SHA-256 hex fingerprint of the refresh token.
    pub token_hash: String,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// Set when the session is revoked (logout, rotation, or forced).
    pub revoked_at: Option<DateTime<Utc>>,
}
