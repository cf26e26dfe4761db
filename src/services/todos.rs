use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::{
    error::Result,
    models::todo::Todo,
    repositories::todo as todo_repo,
    state::AppState,
};

// The owner id on every call here comes from the verified access token
// (IdentityGuard), never from client-supplied data.

/// Creates a new todo for the given owner.
pub async fn create_todo(
    state: &AppState,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    due_date: Option<DateTime<Utc>>,
) -> Result<Todo> {
    todo_repo::create(
        &state.db,
        Uuid::new_v4(),
        user_id,
        &title,
        description.as_deref(),
        due_date,
    )
    .await
}

/// Lists the owner's live todos.
pub async fn list_todos(state: &AppState, user_id: Uuid) -> Result<Vec<Todo>> {
    todo_repo::list_for_user(&state.db, user_id).await
}

/// Fetches one of the owner's todos.
pub async fn get_todo(state: &AppState, user_id: Uuid, todo_id: Uuid) -> Result<Option<Todo>> {
    todo_repo::find_for_user(&state.db, todo_id, user_id).await
}

/// Applies a partial update to one of the owner's todos.
pub async fn update_todo(
    state: &AppState,
    user_id: Uuid,
    todo_id: Uuid,
    title: Option<String>,
    description: Option<String>,
    completed: Option<bool>,
    due_date: Option<DateTime<Utc>>,
) -> Result<Todo> {
    todo_repo::update_for_user(
        &state.db,
        todo_id,
        user_id,
        title.as_deref(),
        description.as_deref(),
        completed,
        due_date,
    )
    .await
}

/// Logically deletes one of the owner's todos.
pub async fn delete_todo(state: &AppState, user_id: Uuid, todo_id: Uuid) -> Result<()> {
    todo_repo::delete_for_user(&state.db, todo_id, user_id).await
}
