use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A todo item owned by a single user.
///
/// Deletion is logical: `is_deleted`/`deleted_at` tombstone the row and
/// all default reads exclude it.
#[derive(Clone, Debug)]
pub struct Todo {
    /// The unique identifier for the todo.
    pub id: Uuid,
    /// The ID of the user who owns the todo.
    pub user_id: Uuid,
    /// The title of the todo.
    pub title: String,
    /// An optional longer description.
    pub description: Option<String>,
    /// Whether the todo has been completed.
    pub completed: bool,
    /// An optional due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Whether the todo has been logically deleted.
    pub is_deleted: bool,
    /// The timestamp when the todo was deleted, if it was.
    pub deleted_at: Option<DateTime<Utc>>,
    /// The timestamp when the todo was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the todo was last updated.
    pub updated_at: DateTime<Utc>,
}
