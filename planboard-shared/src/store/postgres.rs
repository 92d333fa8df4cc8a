/// Postgres backend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::db::pool::health_check;
use crate::models::{
    Activity, Collaborator, Comment, CreateUser, NewActivity, NewComment, NewNotification,
    NewProject, NewTask, Notification, NotificationType, Project, ProjectPatch, Task, TaskCounts,
    TaskPatch, User,
};

/// [`Store`] backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let email = data.email.clone();
        User::create(&self.pool, data).await.map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(format!("email {} is already registered", email))
            }
            other => StoreError::Database(other),
        })
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn create_project(&self, data: NewProject) -> StoreResult<Project> {
        Ok(Project::create(&self.pool, data).await?)
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        Ok(Project::list_for_user(&self.pool, user_id).await?)
    }

    async fn list_projects_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Project>> {
        Ok(Project::list_due_between(&self.pool, from, to).await?)
    }

    async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> StoreResult<Option<Project>> {
        Ok(Project::update(&self.pool, id, patch).await?)
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Project::delete(&self.pool, id).await?)
    }

    async fn set_project_task_counts(
        &self,
        id: Uuid,
        total: i64,
        completed: i64,
    ) -> StoreResult<bool> {
        Ok(Project::set_task_counts(&self.pool, id, total, completed).await?)
    }

    async fn add_collaborator(
        &self,
        project_id: Uuid,
        collaborator: &Collaborator,
    ) -> StoreResult<bool> {
        Ok(Project::add_collaborator(&self.pool, project_id, collaborator).await?)
    }

    async fn remove_collaborator(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(Project::remove_collaborator(&self.pool, project_id, user_id).await?)
    }

    async fn create_task(&self, data: NewTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks_by_project(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_project(&self.pool, project_id).await?)
    }

    async fn list_tasks_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_owner(&self.pool, owner_id).await?)
    }

    async fn list_open_tasks_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Task>> {
        Ok(Task::list_open_by_owner(&self.pool, owner_id).await?)
    }

    async fn count_tasks(&self, project_id: Uuid) -> StoreResult<TaskCounts> {
        Ok(Task::counts_for_project(&self.pool, project_id).await?)
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        Ok(Task::update(&self.pool, id, patch).await?)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn delete_tasks_by_project(&self, project_id: Uuid) -> StoreResult<u64> {
        Ok(Task::delete_by_project(&self.pool, project_id).await?)
    }

    async fn create_comment(&self, data: NewComment) -> StoreResult<Comment> {
        Ok(Comment::create(&self.pool, data).await?)
    }

    async fn list_comments(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        Ok(Comment::list_by_task(&self.pool, task_id).await?)
    }

    async fn delete_comments_by_task(&self, task_id: Uuid) -> StoreResult<u64> {
        Ok(Comment::delete_by_task(&self.pool, task_id).await?)
    }

    async fn delete_comments_by_project(&self, project_id: Uuid) -> StoreResult<u64> {
        Ok(Comment::delete_by_project(&self.pool, project_id).await?)
    }

    async fn create_notification(&self, data: NewNotification) -> StoreResult<Notification> {
        Ok(Notification::create(&self.pool, data).await?)
    }

    async fn get_notification(&self, id: Uuid) -> StoreResult<Option<Notification>> {
        Ok(Notification::find_by_id(&self.pool, id).await?)
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> StoreResult<Vec<Notification>> {
        Ok(Notification::list_for_recipient(&self.pool, recipient_id, unread_only, limit).await?)
    }

    async fn mark_notification_read(&self, id: Uuid) -> StoreResult<Option<Notification>> {
        Ok(Notification::mark_read(&self.pool, id).await?)
    }

    async fn mark_all_notifications_read(&self, recipient_id: Uuid) -> StoreResult<u64> {
        Ok(Notification::mark_all_read(&self.pool, recipient_id).await?)
    }

    async fn delete_notification(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Notification::delete(&self.pool, id).await?)
    }

    async fn count_unread_notifications(&self, recipient_id: Uuid) -> StoreResult<i64> {
        Ok(Notification::count_unread(&self.pool, recipient_id).await?)
    }

    async fn notification_exists_since(
        &self,
        recipient_id: Uuid,
        notification_type: NotificationType,
        related_entity_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(Notification::exists_since(
            &self.pool,
            recipient_id,
            notification_type,
            related_entity_id,
            since,
        )
        .await?)
    }

    async fn delete_read_notifications_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        Ok(Notification::delete_read_before(&self.pool, cutoff).await?)
    }

    async fn create_activity(&self, data: NewActivity) -> StoreResult<Activity> {
        Ok(Activity::create(&self.pool, data).await?)
    }

    async fn list_activities_by_project(
        &self,
        project_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<Activity>> {
        Ok(Activity::list_by_project(&self.pool, project_id, limit).await?)
    }

    async fn list_activities_by_actor(
        &self,
        actor_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<Activity>> {
        Ok(Activity::list_by_actor(&self.pool, actor_id, limit).await?)
    }
}
