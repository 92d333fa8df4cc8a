/// Project and collaborator endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects` - Projects the caller owns or collaborates on
/// - `POST /v1/projects` - Create a project
/// - `GET /v1/projects/:id` - Read a project
/// - `PATCH /v1/projects/:id` - Partial update (owner only)
/// - `DELETE /v1/projects/:id` - Delete with its tasks (owner only)
/// - `GET /v1/projects/:id/collaborators` - List collaborators
/// - `POST /v1/projects/:id/collaborators` - Add a collaborator (owner only)
/// - `DELETE /v1/projects/:id/collaborators/:user_id` - Remove (owner only)

use crate::{app::AppState, error::ApiResult, routes::double_option};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use planboard_shared::auth::middleware::AuthContext;
use planboard_shared::models::{Priority, Project, ProjectPatch, ProjectStatus};
use planboard_shared::services::{CollaboratorInput, CollaboratorView, CreateProject};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// `#rgb` or `#rrggbb`
fn validate_color(color: &str) -> Result<(), ValidationError> {
    let hex = color.strip_prefix('#').unwrap_or("");
    let valid = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("color");
        err.message = Some("Color must be a hex value like #3b82f6".into());
        Err(err)
    }
}

/// Collaborator entry in a create request
#[derive(Debug, Deserialize)]
pub struct CollaboratorRequest {
    pub user_id: Uuid,
    pub role: Option<String>,
}

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,

    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,

    #[serde(default)]
    pub collaborators: Vec<CollaboratorRequest>,
}

/// Partial project update
///
/// Task counters and the owner are not accepted here; unknown fields such as
/// `total_tasks` are ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,

    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    #[validate(custom(function = "validate_color"))]
    pub color: Option<String>,
}

/// Add collaborator request
#[derive(Debug, Deserialize)]
pub struct AddCollaboratorRequest {
    pub user_id: Uuid,

    /// `editor` (default) or `viewer`
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListProjectsResponse {
    pub projects: Vec<Project>,
}

#[derive(Debug, Serialize)]
pub struct ListCollaboratorsResponse {
    pub collaborators: Vec<CollaboratorView>,
}

/// Create project
///
/// ```text
/// POST /v1/projects
/// Authorization: Bearer <jwt_token>
///
/// {
///   "name": "Launch",
///   "due_date": "2026-01-01T00:00:00Z",
///   "collaborators": [{ "user_id": "uuid", "role": "viewer" }]
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed or malformed role
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let Json(req) = payload?;
    req.validate()?;

    let input = CreateProject {
        name: req.name,
        description: req.description,
        status: req.status,
        priority: req.priority,
        start_date: req.start_date,
        due_date: req.due_date,
        color: req.color,
        collaborators: req
            .collaborators
            .into_iter()
            .map(|c| CollaboratorInput {
                user_id: c.user_id,
                role: c.role,
            })
            .collect(),
    };

    let project = state.board.create_project(auth.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ListProjectsResponse>> {
    let projects = state.board.get_projects(auth.user_id).await?;
    Ok(Json(ListProjectsResponse { projects }))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.board.get_project(auth.user_id, id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> ApiResult<Json<Project>> {
    let Json(req) = payload?;
    req.validate()?;

    let patch = ProjectPatch {
        name: req.name,
        description: req.description,
        status: req.status,
        priority: req.priority,
        start_date: req.start_date,
        due_date: req.due_date,
        color: req.color,
    };

    Ok(Json(state.board.update_project(auth.user_id, id, patch).await?))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.board.delete_project(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_collaborators(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ListCollaboratorsResponse>> {
    let collaborators = state.board.list_collaborators(auth.user_id, id).await?;
    Ok(Json(ListCollaboratorsResponse { collaborators }))
}

/// Add collaborator
///
/// # Errors
///
/// - `409 Conflict`: The user is already a collaborator
/// - `422 Unprocessable Entity`: Unknown role, or the user is the owner
pub async fn add_collaborator(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    payload: Result<Json<AddCollaboratorRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let Json(req) = payload?;
    let project = state
        .board
        .add_collaborator(auth.user_id, id, req.user_id, req.role)
        .await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// Remove collaborator; succeeds even if the user was not listed
pub async fn remove_collaborator(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Project>> {
    Ok(Json(
        state.board.remove_collaborator(auth.user_id, id, user_id).await?,
    ))
}
