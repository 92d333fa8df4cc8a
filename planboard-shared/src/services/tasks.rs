/// Task aggregate operations
///
/// Every create, status change and delete is followed by an awaited counter
/// resync of the task's project. Notifications and activity records go out
/// as a [`FollowUp`] afterwards.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::cmp::Ordering;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::activity::{ActivityEntry, EntityRef};
use super::effects::FollowUp;
use super::fanout::{DomainEvent, TaskRef};
use super::{dedup_ids, require_text, Planboard};
use crate::auth::authorization::{
    authorize_owner, require_found, require_ownership, require_project_access,
    require_task_access,
};
use crate::error::{CoreError, CoreResult};
use crate::models::{
    ActivityAction, EntityKind, NewTask, Priority, Task, TaskCounts, TaskPatch, TaskStatus,
};

/// Maximum number of tasks returned by the urgent query
pub const URGENT_LIMIT: usize = 10;

/// A task due within this many days counts as urgent
pub const URGENT_WINDOW_DAYS: i64 = 3;

/// Input for `create_task`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to `todo`
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned_to: Vec<Uuid>,
}

impl CreateTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn assigned(mut self, users: impl IntoIterator<Item = Uuid>) -> Self {
        self.assigned_to.extend(users);
        self
    }
}

/// Open tasks that are high priority or due within [`URGENT_WINDOW_DAYS`]
///
/// Sorted by due date ascending (undated last), then priority descending,
/// capped at [`URGENT_LIMIT`].
pub fn select_urgent(tasks: Vec<Task>, now: DateTime<Utc>) -> Vec<Task> {
    let horizon = now + Duration::days(URGENT_WINDOW_DAYS);

    let mut urgent: Vec<Task> = tasks
        .into_iter()
        .filter(|task| !task.status.is_closed())
        .filter(|task| {
            task.priority == Priority::High
                || task.due_date.map(|due| due >= now && due <= horizon).unwrap_or(false)
        })
        .collect();

    urgent.sort_by(|a, b| {
        let by_due = match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_due.then_with(|| b.priority.cmp(&a.priority))
    });
    urgent.truncate(URGENT_LIMIT);
    urgent
}

fn is_status_only(patch: &TaskPatch) -> bool {
    patch.status.is_some()
        && patch.title.is_none()
        && patch.description.is_none()
        && patch.priority.is_none()
        && patch.due_date.is_none()
        && patch.assigned_to.is_none()
}

/// Users present in `after` but not in `before`
fn newly_assigned(before: &[Uuid], after: &[Uuid]) -> Vec<Uuid> {
    after.iter().filter(|id| !before.contains(id)).copied().collect()
}

impl Planboard {
    /// Creates a task inside a project the requester owns
    pub async fn create_task(
        &self,
        requester_id: Uuid,
        project_id: Uuid,
        input: CreateTask,
    ) -> CoreResult<Task> {
        let project = authorize_owner(
            requester_id,
            EntityKind::Project,
            project_id,
            self.load_project(project_id).await?,
        )?;
        require_text("title", &input.title)?;

        let task = self
            .store
            .create_task(NewTask {
                project_id: project.id,
                title: input.title.trim().to_string(),
                description: input.description,
                status: input.status.unwrap_or_default(),
                priority: input.priority.unwrap_or_default(),
                due_date: input.due_date,
                assigned_to: dedup_ids(input.assigned_to),
                owner_id: requester_id,
            })
            .await?;

        info!(task_id = %task.id, project_id = %project.id, "Task created");
        self.effects.resync_counts(project.id).await;

        let mut follow_up = FollowUp::new().record(
            ActivityEntry::new(requester_id, ActivityAction::CreatedTask, EntityRef::from(&task))
                .in_project(project.id),
        );
        if !task.assigned_to.is_empty() {
            follow_up = follow_up.notify(
                requester_id,
                DomainEvent::TaskAssigned {
                    task: TaskRef::from(&task),
                    assignees: task.assigned_to.clone(),
                },
            );
        }
        self.effects.dispatch(follow_up).await;

        Ok(task)
    }

    /// Visible to the task owner, its assignees and the project's members
    pub async fn get_task(&self, requester_id: Uuid, task_id: Uuid) -> CoreResult<Task> {
        let task = require_found(EntityKind::Task, task_id, self.load_task(task_id).await?)?;
        let project = self.load_project(task.project_id).await?;
        require_task_access(requester_id, &task, project.as_ref())?;
        Ok(task)
    }

    /// Partial update
    ///
    /// The task owner may change any field. An assignee may only move the
    /// status, which is how work assigned to someone else gets completed.
    pub async fn update_task(
        &self,
        requester_id: Uuid,
        task_id: Uuid,
        mut patch: TaskPatch,
    ) -> CoreResult<Task> {
        let before = require_found(EntityKind::Task, task_id, self.load_task(task_id).await?)?;
        if !(before.is_assignee(requester_id) && is_status_only(&patch)) {
            require_ownership(requester_id, &before)?;
        }

        if patch.is_empty() {
            return Ok(before);
        }
        if let Some(title) = &patch.title {
            require_text("title", title)?;
        }
        patch.title = patch.title.map(|t| t.trim().to_string());
        patch.assigned_to = patch.assigned_to.map(dedup_ids);

        let task = self
            .store
            .update_task(task_id, patch)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Task, task_id))?;

        let status_changed = task.status != before.status;
        let completed = status_changed && task.status == TaskStatus::Completed;
        let added = newly_assigned(&before.assigned_to, &task.assigned_to);

        debug!(
            task_id = %task_id,
            status_changed,
            new_assignees = added.len(),
            "Task updated"
        );

        if status_changed {
            self.effects.resync_counts(task.project_id).await;
        }

        let action = if completed {
            ActivityAction::CompletedTask
        } else {
            ActivityAction::UpdatedTask
        };
        let mut follow_up = FollowUp::new().record(
            ActivityEntry::new(requester_id, action, EntityRef::from(&task))
                .in_project(task.project_id)
                .with_metadata(json!({
                    "from_status": before.status.as_str(),
                    "to_status": task.status.as_str(),
                })),
        );

        if completed {
            match self.load_project(task.project_id).await {
                Ok(Some(project)) => {
                    follow_up = follow_up.notify(
                        requester_id,
                        DomainEvent::TaskCompleted {
                            task: TaskRef::from(&task),
                            project_owner: project.owner_id,
                        },
                    );
                }
                Ok(None) => debug!(task_id = %task_id, "Project gone, completion not announced"),
                Err(e) => warn!(
                    task_id = %task_id,
                    error = %e,
                    "Project lookup failed, completion not announced"
                ),
            }
        }

        if !added.is_empty() {
            follow_up = follow_up
                .record(
                    ActivityEntry::new(requester_id, ActivityAction::AssignedTask, EntityRef::from(&task))
                        .in_project(task.project_id)
                        .with_metadata(json!({ "assignees": added })),
                )
                .notify(
                    requester_id,
                    DomainEvent::TaskAssigned {
                        task: TaskRef::from(&task),
                        assignees: added,
                    },
                );
        }

        self.effects.dispatch(follow_up).await;

        Ok(task)
    }

    /// Owner-only delete; the task's comments go with it
    pub async fn delete_task(&self, requester_id: Uuid, task_id: Uuid) -> CoreResult<()> {
        let task = authorize_owner(
            requester_id,
            EntityKind::Task,
            task_id,
            self.load_task(task_id).await?,
        )?;
        let project_id = task.project_id;

        self.store.delete_comments_by_task(task_id).await?;
        if !self.store.delete_task(task_id).await? {
            return Err(CoreError::not_found(EntityKind::Task, task_id));
        }

        info!(task_id = %task_id, project_id = %project_id, "Task deleted");
        self.effects.resync_counts(project_id).await;

        self.effects
            .dispatch(FollowUp::new().record(
                ActivityEntry::new(requester_id, ActivityAction::DeletedTask, EntityRef::from(&task))
                    .in_project(project_id),
            ))
            .await;

        Ok(())
    }

    pub async fn list_tasks_for_project(
        &self,
        requester_id: Uuid,
        project_id: Uuid,
    ) -> CoreResult<Vec<Task>> {
        let project = require_found(
            EntityKind::Project,
            project_id,
            self.load_project(project_id).await?,
        )?;
        require_project_access(requester_id, &project)?;

        Ok(self.store.list_tasks_by_project(project_id).await?)
    }

    /// Tasks the requester created, newest first
    pub async fn list_tasks_for_user(&self, requester_id: Uuid) -> CoreResult<Vec<Task>> {
        Ok(self.store.list_tasks_by_owner(requester_id).await?)
    }

    pub async fn get_urgent_tasks(&self, requester_id: Uuid) -> CoreResult<Vec<Task>> {
        self.urgent_tasks_at(requester_id, Utc::now()).await
    }

    pub(crate) async fn urgent_tasks_at(
        &self,
        requester_id: Uuid,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<Task>> {
        let open = self.store.list_open_tasks_by_owner(requester_id).await?;
        Ok(select_urgent(open, now))
    }

    /// Live counts, independent of the project's stored counters
    pub async fn get_task_stats(
        &self,
        requester_id: Uuid,
        project_id: Uuid,
    ) -> CoreResult<TaskCounts> {
        let project = require_found(
            EntityKind::Project,
            project_id,
            self.load_project(project_id).await?,
        )?;
        require_project_access(requester_id, &project)?;

        Ok(self.store.count_tasks(project_id).await?)
    }
}
