/// Task, task stats and comment endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects/:id/tasks` - Tasks in a project
/// - `POST /v1/projects/:id/tasks` - Create a task (project owner only)
/// - `GET /v1/projects/:id/stats` - Live task counts
/// - `GET /v1/tasks` - Tasks the caller created
/// - `GET /v1/tasks/urgent` - The caller's urgent open tasks
/// - `GET /v1/tasks/:id` - Read a task
/// - `PATCH /v1/tasks/:id` - Partial update
/// - `DELETE /v1/tasks/:id` - Delete (task owner only)
/// - `GET /v1/tasks/:id/comments` - Comments, oldest first
/// - `POST /v1/tasks/:id/comments` - Add a comment

use crate::{app::AppState, error::ApiResult, routes::double_option};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use planboard_shared::auth::middleware::AuthContext;
use planboard_shared::models::{Comment, Priority, Task, TaskCounts, TaskPatch, TaskStatus};
use planboard_shared::services::{AddComment, CreateTask};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    /// Defaults to `todo`
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub assigned_to: Vec<Uuid>,
}

/// Partial task update
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    pub assigned_to: Option<Vec<Uuid>>,
}

/// Add comment request
#[derive(Debug, Deserialize, Validate)]
pub struct AddCommentRequest {
    /// Must match the task's project
    pub project_id: Option<Uuid>,

    #[validate(length(min = 1, max = 2000, message = "Comment must be 1-2000 characters"))]
    pub content: String,

    #[serde(default)]
    pub mentions: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct ListCommentsResponse {
    pub comments: Vec<Comment>,
}

/// Create task
///
/// ```text
/// POST /v1/projects/:id/tasks
/// Authorization: Bearer <jwt_token>
///
/// {
///   "title": "Write copy",
///   "priority": "high",
///   "assigned_to": ["uuid"]
/// }
/// ```
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let Json(req) = payload?;
    req.validate()?;

    let input = CreateTask {
        title: req.title,
        description: req.description,
        status: req.status,
        priority: req.priority,
        due_date: req.due_date,
        assigned_to: req.assigned_to,
    };

    let task = state.board.create_task(auth.user_id, project_id, input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_project_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<ListTasksResponse>> {
    let tasks = state.board.list_tasks_for_project(auth.user_id, project_id).await?;
    Ok(Json(ListTasksResponse { tasks }))
}

/// Live counts, computed from the tasks rather than the project's counters
pub async fn task_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<TaskCounts>> {
    Ok(Json(state.board.get_task_stats(auth.user_id, project_id).await?))
}

pub async fn list_my_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ListTasksResponse>> {
    let tasks = state.board.list_tasks_for_user(auth.user_id).await?;
    Ok(Json(ListTasksResponse { tasks }))
}

pub async fn urgent_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ListTasksResponse>> {
    let tasks = state.board.get_urgent_tasks(auth.user_id).await?;
    Ok(Json(ListTasksResponse { tasks }))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.board.get_task(auth.user_id, id).await?))
}

/// Partial update; assignees may send a status-only patch
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let Json(req) = payload?;
    req.validate()?;

    let patch = TaskPatch {
        title: req.title,
        description: req.description,
        status: req.status,
        priority: req.priority,
        due_date: req.due_date,
        assigned_to: req.assigned_to,
    };

    Ok(Json(state.board.update_task(auth.user_id, id, patch).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.board.delete_task(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ListCommentsResponse>> {
    let comments = state.board.list_comments(auth.user_id, id).await?;
    Ok(Json(ListCommentsResponse { comments }))
}

/// Add comment
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Missing or mismatched `project_id`, or bad content
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    payload: Result<Json<AddCommentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let Json(req) = payload?;
    req.validate()?;

    let comment = state
        .board
        .add_comment(
            auth.user_id,
            id,
            AddComment {
                project_id: req.project_id,
                content: req.content,
                mentions: req.mentions,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
