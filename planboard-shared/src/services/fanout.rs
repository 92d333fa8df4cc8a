/// Notification fan-out
///
/// One [`DomainEvent`] becomes zero or more notifications. Dispatch is a
/// single match over the event kind ([`plan`]), and the self-notification
/// rule is applied once, per recipient, in [`suppress_actor`]. Delivery is
/// best-effort: a failed insert is logged and the remaining recipients are
/// still attempted.

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    CollaboratorRole, EntityKind, NewNotification, Notification, NotificationType, Priority,
    Project, RelatedEntity, Task,
};
use crate::store::Store;

/// Maximum characters of comment text copied into a notification
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Display name used when the actor cannot be resolved
pub const UNKNOWN_ACTOR: &str = "Someone";

/// Task fields needed by notification templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    pub id: Uuid,
    pub title: String,
    pub project_id: Uuid,
}

impl From<&Task> for TaskRef {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            project_id: task.project_id,
        }
    }
}

/// Project fields needed by notification templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub id: Uuid,
    pub name: String,
}

impl From<&Project> for ProjectRef {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
        }
    }
}

/// State transitions that produce notifications
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// Users newly present in a task's assignee set
    TaskAssigned { task: TaskRef, assignees: Vec<Uuid> },

    /// A task entered `completed`
    TaskCompleted { task: TaskRef, project_owner: Uuid },

    /// A comment was added; `mentioned` users are notified by
    /// [`DomainEvent::Mentioned`] instead
    TaskCommented {
        task: TaskRef,
        comment_id: Uuid,
        preview: String,
        assignees: Vec<Uuid>,
        mentioned: Vec<Uuid>,
    },

    Mentioned {
        task: TaskRef,
        comment_id: Uuid,
        preview: String,
        mentioned: Vec<Uuid>,
    },

    /// A project was created with an initial collaborator list
    ProjectInvite {
        project: ProjectRef,
        collaborators: Vec<Uuid>,
    },

    CollaboratorAdded {
        project: ProjectRef,
        collaborator: Uuid,
        role: CollaboratorRole,
    },

    DeadlineApproaching {
        project: ProjectRef,
        recipients: Vec<Uuid>,
        days_left: i64,
    },
}

impl DomainEvent {
    pub fn notification_type(&self) -> NotificationType {
        match self {
            DomainEvent::TaskAssigned { .. } => NotificationType::TaskAssigned,
            DomainEvent::TaskCompleted { .. } => NotificationType::TaskCompleted,
            DomainEvent::TaskCommented { .. } => NotificationType::TaskCommented,
            DomainEvent::Mentioned { .. } => NotificationType::Mention,
            DomainEvent::ProjectInvite { .. } => NotificationType::ProjectInvite,
            DomainEvent::CollaboratorAdded { .. } => NotificationType::CollaboratorAdded,
            DomainEvent::DeadlineApproaching { .. } => NotificationType::DeadlineApproaching,
        }
    }
}

/// Cuts comment text to [`PREVIEW_MAX_CHARS`], appending "..." when cut
pub fn truncate_preview(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= PREVIEW_MAX_CHARS {
        return trimmed.to_string();
    }
    let mut preview: String = trimmed.chars().take(PREVIEW_MAX_CHARS).collect();
    preview.push_str("...");
    preview
}

/// Priority of a deadline reminder
pub fn deadline_priority(days_left: i64) -> Priority {
    if days_left <= 1 {
        Priority::High
    } else {
        Priority::Medium
    }
}

fn task_url(task: &TaskRef) -> String {
    format!("/projects/{}/tasks/{}", task.project_id, task.id)
}

fn project_url(project: &ProjectRef) -> String {
    format!("/projects/{}", project.id)
}

fn due_phrase(days_left: i64) -> String {
    match days_left {
        d if d <= 0 => "is due today".to_string(),
        1 => "is due tomorrow".to_string(),
        d => format!("is due in {} days", d),
    }
}

/// Expands an event into one notification per candidate recipient
///
/// No suppression happens here; see [`suppress_actor`].
pub fn plan(
    actor_id: Option<Uuid>,
    actor_name: &str,
    event: &DomainEvent,
) -> Vec<NewNotification> {
    let notification_type = event.notification_type();

    let build = |recipient_id: Uuid,
                 title: &str,
                 message: String,
                 priority: Priority,
                 related: RelatedEntity,
                 action_url: String,
                 metadata: serde_json::Value| NewNotification {
        recipient_id,
        title: title.to_string(),
        message,
        notification_type,
        priority,
        action_by: actor_id,
        related_entity: Some(related),
        action_url: Some(action_url),
        metadata: Some(metadata),
    };

    match event {
        DomainEvent::TaskAssigned { task, assignees } => assignees
            .iter()
            .map(|&recipient| {
                build(
                    recipient,
                    "New task assigned",
                    format!("{} assigned you to \"{}\"", actor_name, task.title),
                    Priority::Medium,
                    RelatedEntity {
                        id: task.id,
                        kind: EntityKind::Task,
                    },
                    task_url(task),
                    json!({ "project_id": task.project_id }),
                )
            })
            .collect(),

        DomainEvent::TaskCompleted {
            task,
            project_owner,
        } => vec![build(
            *project_owner,
            "Task completed",
            format!("{} completed \"{}\"", actor_name, task.title),
            Priority::Low,
            RelatedEntity {
                id: task.id,
                kind: EntityKind::Task,
            },
            task_url(task),
            json!({ "project_id": task.project_id }),
        )],

        DomainEvent::TaskCommented {
            task,
            comment_id,
            preview,
            assignees,
            mentioned,
        } => assignees
            .iter()
            .filter(|recipient| !mentioned.contains(recipient))
            .map(|&recipient| {
                build(
                    recipient,
                    "New comment",
                    format!("{} commented on \"{}\": {}", actor_name, task.title, preview),
                    Priority::Medium,
                    RelatedEntity {
                        id: task.id,
                        kind: EntityKind::Task,
                    },
                    task_url(task),
                    json!({ "project_id": task.project_id, "comment_id": comment_id }),
                )
            })
            .collect(),

        DomainEvent::Mentioned {
            task,
            comment_id,
            preview,
            mentioned,
        } => mentioned
            .iter()
            .map(|&recipient| {
                build(
                    recipient,
                    "You were mentioned",
                    format!("{} mentioned you in \"{}\": {}", actor_name, task.title, preview),
                    Priority::High,
                    RelatedEntity {
                        id: *comment_id,
                        kind: EntityKind::Comment,
                    },
                    task_url(task),
                    json!({ "project_id": task.project_id, "task_id": task.id }),
                )
            })
            .collect(),

        DomainEvent::ProjectInvite {
            project,
            collaborators,
        } => collaborators
            .iter()
            .map(|&recipient| {
                build(
                    recipient,
                    "Added to project",
                    format!("{} added you to project \"{}\"", actor_name, project.name),
                    Priority::Medium,
                    RelatedEntity {
                        id: project.id,
                        kind: EntityKind::Project,
                    },
                    project_url(project),
                    json!({}),
                )
            })
            .collect(),

        DomainEvent::CollaboratorAdded {
            project,
            collaborator,
            role,
        } => vec![build(
            *collaborator,
            "Added as collaborator",
            format!(
                "{} added you to \"{}\" as {}",
                actor_name, project.name, role
            ),
            Priority::Medium,
            RelatedEntity {
                id: project.id,
                kind: EntityKind::Project,
            },
            project_url(project),
            json!({ "role": role.as_str() }),
        )],

        DomainEvent::DeadlineApproaching {
            project,
            recipients,
            days_left,
        } => recipients
            .iter()
            .map(|&recipient| {
                build(
                    recipient,
                    "Deadline approaching",
                    format!("Project \"{}\" {}", project.name, due_phrase(*days_left)),
                    deadline_priority(*days_left),
                    RelatedEntity {
                        id: project.id,
                        kind: EntityKind::Project,
                    },
                    project_url(project),
                    json!({ "days_left": days_left }),
                )
            })
            .collect(),
    }
}

/// Drops notifications addressed to the actor and repeated recipients
pub fn suppress_actor(actor_id: Option<Uuid>, drafts: Vec<NewNotification>) -> Vec<NewNotification> {
    let mut seen = HashSet::new();
    drafts
        .into_iter()
        .filter(|draft| Some(draft.recipient_id) != actor_id)
        .filter(|draft| seen.insert(draft.recipient_id))
        .collect()
}

/// Resolves a display name, falling back to [`UNKNOWN_ACTOR`]
pub async fn display_name(store: &dyn Store, user_id: Uuid) -> String {
    match store.get_user(user_id).await {
        Ok(Some(user)) => user.name,
        Ok(None) => UNKNOWN_ACTOR.to_string(),
        Err(e) => {
            debug!(user_id = %user_id, error = %e, "User lookup failed, using placeholder name");
            UNKNOWN_ACTOR.to_string()
        }
    }
}

/// Turns domain events into stored notifications
#[derive(Clone)]
pub struct NotificationFanout {
    store: Arc<dyn Store>,
}

impl NotificationFanout {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Plans, filters and stores the notifications for one event
    ///
    /// Returns the notifications that were written. Insert failures are
    /// logged per recipient and never returned.
    pub async fn notify(&self, actor_id: Option<Uuid>, event: &DomainEvent) -> Vec<Notification> {
        let actor_name = match actor_id {
            Some(id) => display_name(self.store.as_ref(), id).await,
            None => UNKNOWN_ACTOR.to_string(),
        };

        let drafts = suppress_actor(actor_id, plan(actor_id, &actor_name, event));
        let notification_type = event.notification_type();

        let mut created = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let recipient_id = draft.recipient_id;
            match self.store.create_notification(draft).await {
                Ok(notification) => created.push(notification),
                Err(e) => warn!(
                    recipient_id = %recipient_id,
                    notification_type = notification_type.as_str(),
                    error = %e,
                    "Failed to store notification"
                ),
            }
        }

        debug!(
            notification_type = notification_type.as_str(),
            delivered = created.len(),
            "Notification fan-out complete"
        );

        created
    }
}
