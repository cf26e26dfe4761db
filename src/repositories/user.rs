use deadpool_postgres::Pool;
use tokio_postgres::{error::SqlState, Row};
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::user::User,
};

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Creates a new user. The email is stored lowercased so uniqueness is
/// case-insensitive.
pub async fn create(
    pool: &Pool,
    id: Uuid,
    email: &str,
    password_hash: &str,
) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, lower($2), $3)
            RETURNING id, email, password_hash, created_at, updated_at
            "#,
            &[&id, &email, &password_hash],
        )
        .await
        .map_err(|e| {
            if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                AppError::EmailAlreadyRegistered
            } else {
                AppError::from(e)
            }
        })?;
    row_to_user(&row)
}

/// Finds a user by their email address, case-insensitively.
pub async fn find_by_email(pool: &Pool, email: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = lower($1)
            "#,
            &[&email],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Finds a user by their ID.
pub async fn find_by_id(pool: &Pool, user_id: &Uuid) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
            &[user_id],
        )
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}
