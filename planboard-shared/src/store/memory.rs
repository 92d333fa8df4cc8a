/// In-memory backend
///
/// Collections are `tokio::sync::RwLock<Vec<T>>` in insertion order, so
/// "newest first" listings are stable even when timestamps tie. Each method
/// takes one lock, matching the single-document atomicity of the Postgres
/// backend.
///
/// Writes to the notification, activity and counter collections can be made
/// to fail on demand, to exercise the best-effort side-effect paths. Project
/// reads can be cut off after a number of successful lookups, which lets a
/// test fail the read that follows a committed write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Activity, Collaborator, Comment, CreateUser, NewActivity, NewComment, NewNotification,
    NewProject, NewTask, Notification, NotificationType, Project, ProjectPatch, ProjectStatus, Task,
    TaskCounts, TaskPatch, User,
};

/// [`Store`] held entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    projects: RwLock<Vec<Project>>,
    tasks: RwLock<Vec<Task>>,
    comments: RwLock<Vec<Comment>>,
    notifications: RwLock<Vec<Notification>>,
    activities: RwLock<Vec<Activity>>,

    fail_notifications: AtomicBool,
    fail_activities: AtomicBool,
    fail_task_counts: AtomicBool,
    /// `Some(n)`: the next `n` project lookups succeed, later ones fail
    project_reads_left: Mutex<Option<usize>>,
}

/// Newest first: reverse insertion order, then a stable sort on `created_at`
fn newest_first<T>(
    items: impl DoubleEndedIterator<Item = T>,
    key: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = items.rev().collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

fn clamp_limit(limit: i64) -> usize {
    usize::try_from(limit.max(0)).unwrap_or(usize::MAX)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every notification insert fail until reset
    pub fn fail_notifications(&self, fail: bool) {
        self.fail_notifications.store(fail, Ordering::SeqCst);
    }

    /// Makes every activity insert fail until reset
    pub fn fail_activities(&self, fail: bool) {
        self.fail_activities.store(fail, Ordering::SeqCst);
    }

    /// Makes every counter write fail until reset
    pub fn fail_task_counts(&self, fail: bool) {
        self.fail_task_counts.store(fail, Ordering::SeqCst);
    }

    /// Lets `allowed` more project lookups through, then fails the rest.
    /// `None` lifts the limit.
    pub fn fail_project_reads_after(&self, allowed: Option<usize>) {
        *self
            .project_reads_left
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = allowed;
    }

    fn take_project_read(&self) -> StoreResult<()> {
        let mut left = self
            .project_reads_left
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match left.as_mut() {
            Some(0) => Err(StoreError::Unavailable("project reads disabled".to_string())),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn check(flag: &AtomicBool, what: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{} writes disabled", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    // Users

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut users = self.users.write().await;

        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&data.email))
        {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                data.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            name: data.name,
            password_hash: data.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    // Projects

    async fn create_project(&self, data: NewProject) -> StoreResult<Project> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            status: data.status,
            priority: data.priority,
            start_date: data.start_date,
            due_date: data.due_date,
            color: data.color,
            total_tasks: 0,
            completed_tasks: 0,
            collaborators: data.collaborators,
            owner_id: data.owner_id,
            created_at: now,
            updated_at: now,
        };
        self.projects.write().await.push(project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        self.take_project_read()?;
        let projects = self.projects.read().await;
        Ok(projects.iter().find(|p| p.id == id).cloned())
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Project>> {
        let projects = self.projects.read().await;
        Ok(newest_first(
            projects.iter().filter(|p| p.has_access(user_id)).cloned(),
            |p| p.created_at,
        ))
    }

    async fn list_projects_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Project>> {
        let projects = self.projects.read().await;
        let mut due: Vec<Project> = projects
            .iter()
            .filter(|p| p.status != ProjectStatus::Completed)
            .filter(|p| matches!(p.due_date, Some(d) if d >= from && d <= to))
            .cloned()
            .collect();
        due.sort_by_key(|p| p.due_date);
        Ok(due)
    }

    async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> StoreResult<Option<Project>> {
        let mut projects = self.projects.write().await;
        Ok(projects.iter_mut().find(|p| p.id == id).map(|project| {
            patch.apply_to(project);
            project.updated_at = Utc::now();
            project.clone()
        }))
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let mut projects = self.projects.write().await;
        let before = projects.len();
        projects.retain(|p| p.id != id);
        Ok(projects.len() < before)
    }

    async fn set_project_task_counts(
        &self,
        id: Uuid,
        total: i64,
        completed: i64,
    ) -> StoreResult<bool> {
        Self::check(&self.fail_task_counts, "counter")?;

        let mut projects = self.projects.write().await;
        match projects.iter_mut().find(|p| p.id == id) {
            Some(project) => {
                project.total_tasks = total;
                project.completed_tasks = completed;
                project.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_collaborator(
        &self,
        project_id: Uuid,
        collaborator: &Collaborator,
    ) -> StoreResult<bool> {
        let mut projects = self.projects.write().await;
        match projects.iter_mut().find(|p| p.id == project_id) {
            Some(project) if !project.is_collaborator(collaborator.user_id) => {
                project.collaborators.push(collaborator.clone());
                project.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_collaborator(&self, project_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut projects = self.projects.write().await;
        match projects.iter_mut().find(|p| p.id == project_id) {
            Some(project) if project.is_collaborator(user_id) => {
                project.collaborators.retain(|c| c.user_id != user_id);
                project.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // Tasks

    async fn create_task(&self, data: NewTask) -> StoreResult<Task> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            due_date: data.due_date,
            assigned_to: data.assigned_to,
            owner_id: data.owner_id,
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tasks_by_project(&self, project_id: Uuid) -> StoreResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(newest_first(
            tasks.iter().filter(|t| t.project_id == project_id).cloned(),
            |t| t.created_at,
        ))
    }

    async fn list_tasks_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(newest_first(
            tasks.iter().filter(|t| t.owner_id == owner_id).cloned(),
            |t| t.created_at,
        ))
    }

    async fn list_open_tasks_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .iter()
            .filter(|t| t.owner_id == owner_id && !t.status.is_closed())
            .cloned()
            .collect())
    }

    async fn count_tasks(&self, project_id: Uuid) -> StoreResult<TaskCounts> {
        let tasks = self.tasks.read().await;
        Ok(TaskCounts::tally(
            tasks.iter().filter(|t| t.project_id == project_id),
        ))
    }

    async fn update_task(&self, id: Uuid, patch: TaskPatch) -> StoreResult<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
            patch.apply_to(task);
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok(tasks.len() < before)
    }

    async fn delete_tasks_by_project(&self, project_id: Uuid) -> StoreResult<u64> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.project_id != project_id);
        Ok((before - tasks.len()) as u64)
    }

    // Comments

    async fn create_comment(&self, data: NewComment) -> StoreResult<Comment> {
        let project_id = data
            .project_id
            .ok_or_else(|| StoreError::Unavailable("comment without project".to_string()))?;

        let comment = Comment {
            id: Uuid::new_v4(),
            task_id: data.task_id,
            project_id,
            author_id: data.author_id,
            content: data.content,
            mentions: data.mentions,
            created_at: Utc::now(),
        };
        self.comments.write().await.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, task_id: Uuid) -> StoreResult<Vec<Comment>> {
        let comments = self.comments.read().await;
        Ok(comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn delete_comments_by_task(&self, task_id: Uuid) -> StoreResult<u64> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|c| c.task_id != task_id);
        Ok((before - comments.len()) as u64)
    }

    async fn delete_comments_by_project(&self, project_id: Uuid) -> StoreResult<u64> {
        let mut comments = self.comments.write().await;
        let before = comments.len();
        comments.retain(|c| c.project_id != project_id);
        Ok((before - comments.len()) as u64)
    }

    // Notifications

    async fn create_notification(&self, data: NewNotification) -> StoreResult<Notification> {
        Self::check(&self.fail_notifications, "notification")?;

        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: data.recipient_id,
            title: data.title,
            message: data.message,
            notification_type: data.notification_type,
            priority: data.priority,
            action_by: data.action_by,
            related_entity_id: data.related_entity.map(|e| e.id),
            related_entity_kind: data.related_entity.map(|e| e.kind),
            action_url: data.action_url,
            metadata: data.metadata,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        self.notifications.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn get_notification(&self, id: Uuid) -> StoreResult<Option<Notification>> {
        let notifications = self.notifications.read().await;
        Ok(notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn list_notifications(
        &self,
        recipient_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> StoreResult<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mut out = newest_first(
            notifications
                .iter()
                .filter(|n| n.recipient_id == recipient_id)
                .filter(|n| !unread_only || !n.is_read)
                .cloned(),
            |n| n.created_at,
        );
        out.truncate(clamp_limit(limit));
        Ok(out)
    }

    async fn mark_notification_read(&self, id: Uuid) -> StoreResult<Option<Notification>> {
        let mut notifications = self.notifications.write().await;
        Ok(notifications.iter_mut().find(|n| n.id == id).map(|n| {
            if !n.is_read {
                n.is_read = true;
                n.read_at = Some(Utc::now());
            }
            n.clone()
        }))
    }

    async fn mark_all_notifications_read(&self, recipient_id: Uuid) -> StoreResult<u64> {
        let mut notifications = self.notifications.write().await;
        let now = Utc::now();
        let mut updated = 0;
        for n in notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
        {
            n.is_read = true;
            n.read_at = Some(now);
            updated += 1;
        }
        Ok(updated)
    }

    async fn delete_notification(&self, id: Uuid) -> StoreResult<bool> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|n| n.id != id);
        Ok(notifications.len() < before)
    }

    async fn count_unread_notifications(&self, recipient_id: Uuid) -> StoreResult<i64> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count() as i64)
    }

    async fn notification_exists_since(
        &self,
        recipient_id: Uuid,
        notification_type: NotificationType,
        related_entity_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let notifications = self.notifications.read().await;
        Ok(notifications.iter().any(|n| {
            n.recipient_id == recipient_id
                && n.notification_type == notification_type
                && n.related_entity_id == Some(related_entity_id)
                && n.created_at >= since
        }))
    }

    async fn delete_read_notifications_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|n| !(n.is_read && n.created_at < cutoff));
        Ok((before - notifications.len()) as u64)
    }

    // Activities

    async fn create_activity(&self, data: NewActivity) -> StoreResult<Activity> {
        Self::check(&self.fail_activities, "activity")?;

        let activity = Activity {
            id: Uuid::new_v4(),
            actor_id: data.actor_id,
            action: data.action,
            entity_kind: data.entity_kind,
            entity_id: data.entity_id,
            entity_name: data.entity_name,
            project_id: data.project_id,
            description: data.description,
            metadata: data.metadata,
            created_at: Utc::now(),
        };
        self.activities.write().await.push(activity.clone());
        Ok(activity)
    }

    async fn list_activities_by_project(
        &self,
        project_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<Activity>> {
        let activities = self.activities.read().await;
        let mut out = newest_first(
            activities
                .iter()
                .filter(|a| a.project_id == Some(project_id))
                .cloned(),
            |a| a.created_at,
        );
        out.truncate(clamp_limit(limit));
        Ok(out)
    }

    async fn list_activities_by_actor(
        &self,
        actor_id: Uuid,
        limit: i64,
    ) -> StoreResult<Vec<Activity>> {
        let activities = self.activities.read().await;
        let mut out = newest_first(
            activities.iter().filter(|a| a.actor_id == actor_id).cloned(),
            |a| a.created_at,
        );
        out.truncate(clamp_limit(limit));
        Ok(out)
    }
}
