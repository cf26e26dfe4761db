use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::CurrentUser,
    models::todo::Todo,
    services::todos as todo_service,
    state::AppState,
};

/// The request payload for creating a todo.
#[derive(Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

/// The request payload for updating a todo. Absent fields are left
/// unchanged.
#[derive(Deserialize)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub due_date: Option<DateTime<Utc>>,
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() || title.len() > 500 {
        return Err(AppError::Validation(
            "Title must be between 1 and 500 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<()> {
    if description.is_some_and(|d| d.len() > 2000) {
        return Err(AppError::Validation(
            "Description must be at most 2000 characters".to_string(),
        ));
    }
    Ok(())
}

fn todo_json(todo: &Todo) -> sonic_rs::Value {
    sonic_rs::json!({
        "id": todo.id.to_string(),
        "title": todo.title,
        "description": todo.description,
        "completed": todo.completed,
        "due_date": todo.due_date.map(|d| d.to_rfc3339()),
        "created_at": todo.created_at.to_rfc3339(),
        "updated_at": todo.updated_at.to_rfc3339()
    })
}

/// Creates a new todo for the authenticated user.
#[axum::debug_handler]
pub async fn create_todo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateTodoRequest>,
) -> Result<Response> {
    validate_title(&req.title)?;
    validate_description(req.description.as_deref())?;

    let todo = todo_service::create_todo(
        &state,
        user.id,
        req.title,
        req.description,
        req.due_date,
    )
    .await?;

    let body = sonic_rs::to_string(&todo_json(&todo))
        .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::CREATED, body).into_response())
}

/// Lists the authenticated user's todos.
#[axum::debug_handler]
pub async fn list_todos(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Response> {
    let todos = todo_service::list_todos(&state, user.id).await?;

    let items: Vec<_> = todos.iter().map(todo_json).collect();
    let count = items.len();
    let body = sonic_rs::to_string(&sonic_rs::json!({
        "todos": items,
        "count": count
    }))
    .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Fetches a single todo. A todo owned by someone else is a 404, same
/// as one that does not exist.
#[axum::debug_handler]
pub async fn get_todo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(todo_id): Path<Uuid>,
) -> Result<Response> {
    let todo = todo_service::get_todo(&state, user.id, todo_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let body = sonic_rs::to_string(&todo_json(&todo))
        .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Updates a todo owned by the authenticated user.
#[axum::debug_handler]
pub async fn update_todo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(todo_id): Path<Uuid>,
    Json(req): Json<UpdateTodoRequest>,
) -> Result<Response> {
    if let Some(title) = req.title.as_deref() {
        validate_title(title)?;
    }
    validate_description(req.description.as_deref())?;

    let todo = todo_service::update_todo(
        &state,
        user.id,
        todo_id,
        req.title,
        req.description,
        req.completed,
        req.due_date,
    )
    .await?;

    let body = sonic_rs::to_string(&todo_json(&todo))
        .map_err(|e| AppError::Internal(format!("Response serialization failed: {}", e)))?;

    Ok((StatusCode::OK, body).into_response())
}

/// Logically deletes a todo owned by the authenticated user.
#[axum::debug_handler]
pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(todo_id): Path<Uuid>,
) -> Result<Response> {
    todo_service::delete_todo(&state, user.id, todo_id).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
