use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::todo::Todo,
};

// Every query in this module carries the owner predicate. The caller's
// user id comes from the verified access token, never from the request
// body, and a row owned by someone else is indistinguishable from an
// absent one.

/// A helper function to map a `tokio_postgres::Row` to a `Todo`.
fn row_to_todo(row: &Row) -> Result<Todo> {
    Ok(Todo {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        completed: row.try_get("completed")?,
        due_date: row.try_get("due_date")?,
        is_deleted: row.try_get("is_deleted")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Creates a new todo owned by `user_id`.
pub async fn create(
    pool: &Pool,
    id: Uuid,
    user_id: Uuid,
    title: &str,
    description: Option<&str>,
    due_date: Option<DateTime<Utc>>,
) -> Result<Todo> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO todos (id, user_id, title, description, due_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, description, completed, due_date,
                      is_deleted, deleted_at, created_at, updated_at
            "#,
            &[&id, &user_id, &title, &description, &due_date],
        )
        .await?;
    row_to_todo(&row)
}

/// Lists all live todos owned by `user_id`, newest first.
pub async fn list_for_user(pool: &Pool, user_id: Uuid) -> Result<Vec<Todo>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT id, user_id, title, description, completed, due_date,
                   is_deleted, deleted_at, created_at, updated_at
            FROM todos
            WHERE user_id = $1 AND is_deleted = false
            ORDER BY created_at DESC
            "#,
            &[&user_id],
        )
        .await?;
    rows.iter().map(row_to_todo).collect()
}

/// Point lookup scoped to the owner.
pub async fn find_for_user(pool: &Pool, todo_id: Uuid, user_id: Uuid) -> Result<Option<Todo>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT id, user_id, title, description, completed, due_date,
                   is_deleted, deleted_at, created_at, updated_at
            FROM todos
            WHERE id = $1 AND user_id = $2 AND is_deleted = false
            "#,
            &[&todo_id, &user_id],
        )
        .await?;
    row.map(|r| row_to_todo(&r)).transpose()
}

/// Updates a todo. The ownership check is part of the same statement as
/// the mutation, so there is no window between check and write.
pub async fn update_for_user(
    pool: &Pool,
    todo_id: Uuid,
    user_id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    completed: Option<bool>,
    due_date: Option<DateTime<Utc>>,
) -> Result<Todo> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            UPDATE todos
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                completed = COALESCE($5, completed),
                due_date = COALESCE($6, due_date),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND is_deleted = false
            RETURNING id, user_id, title, description, completed, due_date,
                      is_deleted, deleted_at, created_at, updated_at
            "#,
            &[&todo_id, &user_id, &title, &description, &completed, &due_date],
        )
        .await?
        .ok_or(AppError::NotFound)?;
    row_to_todo(&row)
}

/// Logically deletes a todo, same single-statement ownership rule as
/// `update_for_user`.
pub async fn delete_for_user(pool: &Pool, todo_id: Uuid, user_id: Uuid) -> Result<()> {
    let client = pool.get().await?;
    let affected = client
        .execute(
            r#"
            UPDATE todos
            SET is_deleted = true, deleted_at = NOW()
            WHERE id = $1 AND user_id = $2 AND is_deleted = false
            "#,
            &[&todo_id, &user_id],
        )
        .await?;

    if affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
