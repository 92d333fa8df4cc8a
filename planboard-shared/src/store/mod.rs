/// Persistence collaborator
///
/// The engine talks to storage only through [`Store`]. Every method is a
/// single-document operation; nothing here spans documents atomically, and
/// callers must not assume it does.
///
/// Two backends implement the trait:
///
/// - [`PgStore`]: Postgres, delegating to the SQL on each model type
/// - [`MemoryStore`]: `tokio::sync::RwLock` collections, used by tests and
///   the `memory` backend

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Activity, Collaborator, Comment, CreateUser, NewActivity, NewComment, NewNotification,
    NewProject, NewTask, Notification, NotificationType, Project, ProjectPatch, Task, TaskCounts,
    TaskPatch, User,
};

/// Error returned by a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage operations used by the engine
#[async_trait]
pub trait Store: Send + Sync {
    // ========================================================================
    // Health
    // ========================================================================

    /// Verifies the backend answers
    async fn ping(&self) -> StoreResult<()>;

    // ========================================================================
    // Users
    // ========================================================================

    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    // ========================================================================
    // Projects
    // ========================================================================

    async fn create_project(&self, data: NewProject) -> StoreResult<Project>;

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>>;

    /// Projects the user owns or collaborates on, newest first
    async fn list_projects_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Project>>;

    /// Non-completed projects whose due date falls in `[from, to]`
    async fn list_projects_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Project>>;

    async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> StoreResult<Option<Project>>;

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool>;

    /// Overwrites the derived counters; false if the project is gone
    async fn set_project_task_counts(&self, id: Uuid, total: i64, completed: i64)
        -> StoreResult<bool>;

    /// Appends unless the user is already listed; false if nothing was written
    async fn add_collaborator(&self, project_id: Uuid, collaborator: &Collaborator)
        -> StoreResult<bool>;

    /// Removes the user's entry; false if nothing changed
    async fn remove_collaborator(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    // ========================================================================
    // Tasks
    // ========================================================================

    async fn create_task(&self, data: NewTask) -> StoreResult<Task>;

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Newest first
    async fn list_tasks_by_project(&self, project_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Newest first
    async fn list_tasks_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Owner's tasks that are neither completed nor archived, unordered
    async fn list_open_tasks_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Task>>;

    /// Live counts over the project's tasks
    async fn count_tasks(&self, project_id: Uuid) -> StoreResult<TaskCounts>;

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    async fn delete_tasks_by_project(&self, project_id: Uuid) -> StoreResult<u64>;

    // ========================================================================
    // Comments
    // ========================================================================

    async fn create_comment(&self, data: NewComment) -> StoreResult<Comment>;

    /// Oldest first
    async fn list_comments(&self, task_id: Uuid) -> StoreResult<Vec<Comment>>;

    async fn delete_comments_by_task(&self, task_id: Uuid) -> StoreResult<u64>;

    async fn delete_comments_by_project(&self, project_id: Uuid) -> StoreResult<u64>;

    // ========================================================================
    // Notifications
    // ========================================================================

    async fn create_notification(&self, data: NewNotification) -> StoreResult<Notification>;

    async fn get_notification(&self, id: Uuid) -> StoreResult<Option<Notification>>;

    /// Newest first, at most `limit`
    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> StoreResult<Vec<Notification>>;

    async fn mark_notification_read(&self, id: Uuid) -> StoreResult<Option<Notification>>;

    async fn mark_all_notifications_read(&self, recipient_id: Uuid) -> StoreResult<u64>;

    async fn delete_notification(&self, id: Uuid) -> StoreResult<bool>;

    async fn count_unread_notifications(&self, recipient_id: Uuid) -> StoreResult<i64>;

    /// Whether a matching notification was created at or after `since`
    async fn notification_exists_since(
        &self,
        recipient_id: Uuid,
        notification_type: NotificationType,
        related_entity_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Retention sweep: removes read notifications created before `cutoff`
    async fn delete_read_notifications_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;

    // ========================================================================
    // Activities
    // ========================================================================

    async fn create_activity(&self, data: NewActivity) -> StoreResult<Activity>;

    /// Newest first, at most `limit`
    async fn list_activities_by_project(
        &self,
        project_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<Activity>>;

    /// Newest first, at most `limit`
    async fn list_activities_by_actor(&self, actor_id: Uuid, limit: i64)
        -> StoreResult<Vec<Activity>>;
}
