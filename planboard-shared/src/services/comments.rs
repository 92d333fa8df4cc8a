/// Task comments

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::activity::{ActivityEntry, EntityRef};
use super::effects::FollowUp;
use super::fanout::{truncate_preview, DomainEvent, TaskRef};
use super::{dedup_ids, Planboard};
use crate::auth::authorization::{require_found, require_task_access};
use crate::error::{CoreError, CoreResult};
use crate::models::{ActivityAction, Comment, EntityKind, NewComment, Task};

/// Input for `add_comment`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddComment {
    /// Must name the task's project
    #[serde(default)]
    pub project_id: Option<Uuid>,
    pub content: String,
    #[serde(default)]
    pub mentions: Vec<Uuid>,
}

impl Planboard {
    /// Loads a task and checks the requester may read and discuss it
    async fn discussable_task(&self, requester_id: Uuid, task_id: Uuid) -> CoreResult<Task> {
        let task = require_found(EntityKind::Task, task_id, self.load_task(task_id).await?)?;
        let project = self.load_project(task.project_id).await?;
        require_task_access(requester_id, &task, project.as_ref())?;
        Ok(task)
    }

    pub async fn add_comment(
        &self,
        requester_id: Uuid,
        task_id: Uuid,
        input: AddComment,
    ) -> CoreResult<Comment> {
        let task = self.discussable_task(requester_id, task_id).await?;

        let draft = NewComment {
            task_id,
            project_id: input.project_id,
            author_id: requester_id,
            content: input.content.trim().to_string(),
            mentions: dedup_ids(input.mentions),
        };
        draft.validate().map_err(CoreError::ValidationFailed)?;
        if draft.project_id != Some(task.project_id) {
            return Err(CoreError::ValidationFailed(
                "project_id does not match the task's project".to_string(),
            ));
        }

        let comment = self.store.create_comment(draft).await?;
        info!(comment_id = %comment.id, task_id = %task_id, "Comment added");

        let preview = truncate_preview(&comment.content);
        let mut follow_up = FollowUp::new().record(
            ActivityEntry::new(requester_id, ActivityAction::Commented, EntityRef::from(&task))
                .in_project(task.project_id),
        );
        if !comment.mentions.is_empty() {
            follow_up = follow_up.notify(
                requester_id,
                DomainEvent::Mentioned {
                    task: TaskRef::from(&task),
                    comment_id: comment.id,
                    preview: preview.clone(),
                    mentioned: comment.mentions.clone(),
                },
            );
        }
        if !task.assigned_to.is_empty() {
            follow_up = follow_up.notify(
                requester_id,
                DomainEvent::TaskCommented {
                    task: TaskRef::from(&task),
                    comment_id: comment.id,
                    preview,
                    assignees: task.assigned_to.clone(),
                    mentioned: comment.mentions.clone(),
                },
            );
        }
        self.effects.dispatch(follow_up).await;

        Ok(comment)
    }

    /// Oldest first
    pub async fn list_comments(&self, requester_id: Uuid, task_id: Uuid) -> CoreResult<Vec<Comment>> {
        self.discussable_task(requester_id, task_id).await?;
        Ok(self.store.list_comments(task_id).await?)
    }
}
