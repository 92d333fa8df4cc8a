/// Activity feed endpoints
///
/// - `GET /v1/projects/:id/activities?limit=20` - Project feed (owner and collaborators)
/// - `GET /v1/activities/me?limit=20` - The caller's own actions

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension, Json,
};
use planboard_shared::auth::middleware::AuthContext;
use planboard_shared::models::Activity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    /// Clamped to 1-200, default 50
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListActivitiesResponse {
    pub activities: Vec<Activity>,
}

pub async fn list_project_activities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(project_id): Path<Uuid>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> ApiResult<Json<ListActivitiesResponse>> {
    let Query(query) = query?;
    let activities = state
        .board
        .list_activities(auth.user_id, project_id, query.limit)
        .await?;
    Ok(Json(ListActivitiesResponse { activities }))
}

pub async fn list_my_activities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> ApiResult<Json<ListActivitiesResponse>> {
    let Query(query) = query?;
    let activities = state
        .board
        .list_user_activities(auth.user_id, query.limit)
        .await?;
    Ok(Json(ListActivitiesResponse { activities }))
}
