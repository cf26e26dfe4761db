use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents a registered user.
#[derive(Clone, Debug)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's email address, stored lowercased.
    pub email: String,
    /// The Argon2id digest of the user's password.
    pub password_hash: String,
    /// The timestamp when the user was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the user was last updated.
    pub updated_at: DateTime<Utc>,
}
