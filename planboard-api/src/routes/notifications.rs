/// Notification inbox endpoints
///
/// Every endpoint acts on the caller's own inbox. Touching somebody else's
/// notification is a 403.
///
/// # Endpoints
///
/// - `GET /v1/notifications?unread_only=true&limit=20` - Newest first
/// - `GET /v1/notifications/unread-count` - Badge count
/// - `POST /v1/notifications/read-all` - Mark everything read
/// - `POST /v1/notifications/:id/read` - Mark one read
/// - `DELETE /v1/notifications/:id` - Delete one

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use planboard_shared::auth::middleware::AuthContext;
use planboard_shared::models::Notification;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inbox query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,

    /// Clamped to 1-100, default 50
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListNotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    query: Result<Query<ListNotificationsQuery>, QueryRejection>,
) -> ApiResult<Json<ListNotificationsResponse>> {
    let Query(query) = query?;
    let notifications = state
        .board
        .list_notifications(auth.user_id, query.unread_only.unwrap_or(false), query.limit)
        .await?;
    Ok(Json(ListNotificationsResponse { notifications }))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UnreadCountResponse>> {
    let unread = state.board.get_unread_count(auth.user_id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let updated = state.board.mark_all_notifications_read(auth.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// Mark one notification read; repeating it is harmless
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Notification>> {
    Ok(Json(
        state.board.mark_notification_read(auth.user_id, id).await?,
    ))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.board.delete_notification(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
