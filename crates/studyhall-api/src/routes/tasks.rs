//! Personal task routes. Everything is scoped to the caller; ownership
//! is enforced in the repository WHERE clauses.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use std::sync::Arc;
use studyhall_common::{
    models::task::{CreateTaskRequest, UpdateTaskRequest, UserTask},
    validation::validate_request,
    HallError, HallResult,
};
use studyhall_db::repository::tasks;
use uuid::Uuid;

use crate::{middleware::AuthContext, AppState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", put(update_task).delete(delete_task))
        .route("/tasks/{id}/toggle", post(toggle_task))
}

/// GET /api/v1/tasks
async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> HallResult<Json<Vec<UserTask>>> {
    let tasks = tasks::list_tasks(&state.db.pool, auth.user_id).await?;
    Ok(Json(tasks))
}

/// POST /api/v1/tasks
async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CreateTaskRequest>,
) -> HallResult<Json<UserTask>> {
    validate_request(&body)?;

    let tags = serde_json::json!(body.tags.unwrap_or_default());
    let task = tasks::create_task(
        &state.db.pool,
        auth.user_id,
        &body.title,
        body.description.as_deref().unwrap_or(""),
        body.due_date,
        body.priority.as_deref().unwrap_or("medium"),
        body.category.as_deref().unwrap_or("general"),
        body.subject.as_deref().unwrap_or(""),
        body.estimated_time.unwrap_or(30),
        &tags,
    )
    .await?;
    Ok(Json(task))
}

/// PUT /api/v1/tasks/{id}
async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
    Json(body): Json<UpdateTaskRequest>,
) -> HallResult<Json<UserTask>> {
    validate_request(&body)?;

    let tags = body.tags.map(|t| serde_json::json!(t));
    let task = tasks::update_task(
        &state.db.pool,
        task_id,
        auth.user_id,
        body.title.as_deref(),
        body.description.as_deref(),
        body.due_date,
        body.priority.as_deref(),
        body.category.as_deref(),
        body.subject.as_deref(),
        body.estimated_time,
        body.completion_percentage,
        tags.as_ref(),
    )
    .await?
    .ok_or(HallError::NotFound {
        resource: "Task".into(),
    })?;
    Ok(Json(task))
}

/// POST /api/v1/tasks/{id}/toggle
async fn toggle_task(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> HallResult<Json<UserTask>> {
    let task = tasks::toggle_task(&state.db.pool, task_id, auth.user_id)
        .await?
        .ok_or(HallError::NotFound {
            resource: "Task".into(),
        })?;
    Ok(Json(task))
}

/// DELETE /api/v1/tasks/{id}
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> HallResult<StatusCode> {
    let deleted = tasks::delete_task(&state.db.pool, task_id, auth.user_id).await?;
    if !deleted {
        return Err(HallError::NotFound {
            resource: "Task".into(),
        });
    }
    Ok(StatusCode::NO_CONTENT)
}
