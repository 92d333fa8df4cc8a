/// Project operations

use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

use super::activity::{ActivityEntry, EntityRef};
use super::chat::WelcomeMessage;
use super::effects::FollowUp;
use super::fanout::{DomainEvent, ProjectRef};
use super::{require_text, Planboard};
use crate::auth::authorization::{authorize_owner, require_found, require_project_access};
use crate::error::{CoreError, CoreResult};
use crate::models::project::DEFAULT_PROJECT_COLOR;
use crate::models::{
    ActivityAction, Collaborator, CollaboratorRole, EntityKind, NewProject, Priority, Project,
    ProjectPatch, ProjectStatus,
};

/// Collaborator supplied at creation or addition; `role` defaults to editor
#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorInput {
    pub user_id: Uuid,
    #[serde(default)]
    pub role: Option<String>,
}

/// Input for `create_project`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub collaborators: Vec<CollaboratorInput>,
}

impl CreateProject {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Parses an optional role label; absent means editor
pub(crate) fn parse_role(role: Option<&str>) -> CoreResult<CollaboratorRole> {
    match role {
        None => Ok(CollaboratorRole::default()),
        Some(label) => label.parse().map_err(CoreError::ValidationFailed),
    }
}

fn check_dates(project: &Project) -> CoreResult<()> {
    if let (Some(start), Some(due)) = (project.start_date, project.due_date) {
        if due < start {
            return Err(CoreError::ValidationFailed(
                "due_date must not be before start_date".to_string(),
            ));
        }
    }
    Ok(())
}

impl Planboard {
    /// Creates a project owned by the requester
    ///
    /// Initial collaborators are deduplicated by user; the owner is never
    /// listed as a collaborator of their own project.
    pub async fn create_project(
        &self,
        requester_id: Uuid,
        input: CreateProject,
    ) -> CoreResult<Project> {
        require_text("name", &input.name)?;
        if let (Some(start), Some(due)) = (input.start_date, input.due_date) {
            if due < start {
                return Err(CoreError::ValidationFailed(
                    "due_date must not be before start_date".to_string(),
                ));
            }
        }

        let mut seen = HashSet::new();
        let mut collaborators = Vec::new();
        for entry in input.collaborators {
            let role = parse_role(entry.role.as_deref())?;
            if entry.user_id == requester_id || !seen.insert(entry.user_id) {
                continue;
            }
            collaborators.push(Collaborator::new(entry.user_id, role));
        }

        let project = self
            .store
            .create_project(NewProject {
                name: input.name.trim().to_string(),
                description: input.description,
                status: input.status.unwrap_or_default(),
                priority: input.priority.unwrap_or_default(),
                start_date: input.start_date,
                due_date: input.due_date,
                color: input.color.unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()),
                owner_id: requester_id,
                collaborators,
            })
            .await?;

        info!(project_id = %project.id, owner_id = %requester_id, "Project created");

        let invited: Vec<Uuid> = project.collaborators.iter().map(|c| c.user_id).collect();
        let mut follow_up = FollowUp::new()
            .record(ActivityEntry::new(
                requester_id,
                ActivityAction::CreatedProject,
                EntityRef::from(&project),
            )
            .in_project(project.id))
            .welcome(WelcomeMessage::project_created(
                project.id,
                &project.name,
                project.participants(),
            ));
        if !invited.is_empty() {
            follow_up = follow_up.notify(
                requester_id,
                DomainEvent::ProjectInvite {
                    project: ProjectRef::from(&project),
                    collaborators: invited,
                },
            );
        }
        self.effects.dispatch(follow_up).await;

        Ok(project)
    }

    /// Projects the requester owns or collaborates on, newest first
    pub async fn get_projects(&self, requester_id: Uuid) -> CoreResult<Vec<Project>> {
        Ok(self.store.list_projects_for_user(requester_id).await?)
    }

    /// Visible to the owner and collaborators
    pub async fn get_project(&self, requester_id: Uuid, project_id: Uuid) -> CoreResult<Project> {
        let project = require_found(
            EntityKind::Project,
            project_id,
            self.load_project(project_id).await?,
        )?;
        require_project_access(requester_id, &project)?;
        Ok(project)
    }

    /// Owner-only partial update
    ///
    /// Counters and the owner are not part of [`ProjectPatch`] and cannot be
    /// written through here.
    pub async fn update_project(
        &self,
        requester_id: Uuid,
        project_id: Uuid,
        patch: ProjectPatch,
    ) -> CoreResult<Project> {
        let mut preview = authorize_owner(
            requester_id,
            EntityKind::Project,
            project_id,
            self.load_project(project_id).await?,
        )?;

        if patch.is_empty() {
            return Ok(preview);
        }
        if let Some(name) = &patch.name {
            require_text("name", name)?;
        }
        patch.apply_to(&mut preview);
        check_dates(&preview)?;

        let changed: Vec<&str> = [
            ("name", patch.name.is_some()),
            ("description", patch.description.is_some()),
            ("status", patch.status.is_some()),
            ("priority", patch.priority.is_some()),
            ("start_date", patch.start_date.is_some()),
            ("due_date", patch.due_date.is_some()),
            ("color", patch.color.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, present)| present.then_some(field))
        .collect();

        let project = self
            .store
            .update_project(project_id, patch)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Project, project_id))?;

        debug!(project_id = %project_id, fields = ?changed, "Project updated");

        self.effects
            .dispatch(FollowUp::new().record(
                ActivityEntry::new(requester_id, ActivityAction::UpdatedProject, EntityRef::from(&project))
                    .in_project(project.id)
                    .with_metadata(json!({ "fields": changed })),
            ))
            .await;

        Ok(project)
    }

    /// Owner-only delete; removes the project's comments and tasks first
    ///
    /// The three deletes are separate statements. A failure part-way leaves
    /// the project in place with fewer tasks, and retrying completes it.
    pub async fn delete_project(&self, requester_id: Uuid, project_id: Uuid) -> CoreResult<()> {
        let project = authorize_owner(
            requester_id,
            EntityKind::Project,
            project_id,
            self.load_project(project_id).await?,
        )?;

        let comments = self.store.delete_comments_by_project(project_id).await?;
        let tasks = self.store.delete_tasks_by_project(project_id).await?;
        self.store.delete_project(project_id).await?;

        info!(
            project_id = %project_id,
            tasks_deleted = tasks,
            comments_deleted = comments,
            "Project deleted"
        );

        self.effects
            .dispatch(FollowUp::new().record(
                ActivityEntry::new(requester_id, ActivityAction::DeletedProject, EntityRef::from(&project))
                    .in_project(project.id)
                    .with_metadata(json!({ "tasks_deleted": tasks })),
            ))
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationType, TaskPatch};
    use crate::services::testing::Harness;
    use crate::store::Store;
    use crate::services::CreateTask;

    #[tokio::test]
    async fn test_create_sets_owner_and_zero_counters() {
        let h = Harness::new();
        let ada = h.user("Ada").await;

        let project = h.project(&ada, "Launch").await;
        assert_eq!(project.owner_id, ada.id);
        assert_eq!((project.total_tasks, project.completed_tasks), (0, 0));
        assert_eq!(project.status, ProjectStatus::Planning);
        assert_eq!(project.color, DEFAULT_PROJECT_COLOR);

        let activity = h.store.list_activities_by_actor(ada.id, 10).await.unwrap();
        assert_eq!(activity[0].action, ActivityAction::CreatedProject);
    }

    #[tokio::test]
    async fn test_create_invites_collaborators_but_not_owner() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let grace = h.user("Grace").await;

        let mut input = CreateProject::named("Launch");
        input.collaborators = vec![
            CollaboratorInput { user_id: grace.id, role: Some("viewer".to_string()) },
            CollaboratorInput { user_id: grace.id, role: None },
            CollaboratorInput { user_id: ada.id, role: None },
        ];
        let project = h.board.create_project(ada.id, input).await.unwrap();

        assert_eq!(project.collaborators.len(), 1);
        assert_eq!(project.collaborators[0].role, CollaboratorRole::Viewer);

        let inbox = h.inbox(&grace).await;
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].notification_type, NotificationType::ProjectInvite);
        assert!(h.inbox(&ada).await.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_role_and_blank_name() {
        let h = Harness::new();
        let ada = h.user("Ada").await;

        let mut input = CreateProject::named("Launch");
        input.collaborators = vec![CollaboratorInput {
            user_id: Uuid::new_v4(),
            role: Some("overlord".to_string()),
        }];
        let err = h.board.create_project(ada.id, input).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed(_)));

        let err = h.board.create_project(ada.id, CreateProject::named("  ")).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_owner_only_operations_forbidden_for_others() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let grace = h.user("Grace").await;
        let project = h.project(&ada, "Launch").await;
        h.board
            .add_collaborator(ada.id, project.id, grace.id, None)
            .await
            .unwrap();

        // Collaborators do not pass owner-only checks
        for user in [grace.id, Uuid::new_v4()] {
            let patch = ProjectPatch {
                name: Some("Hijacked".to_string()),
                ..Default::default()
            };
            assert!(matches!(
                h.board.update_project(user, project.id, patch).await,
                Err(CoreError::Forbidden(_))
            ));
            assert!(matches!(
                h.board.delete_project(user, project.id).await,
                Err(CoreError::Forbidden(_))
            ));
            assert!(matches!(
                h.board.add_collaborator(user, project.id, Uuid::new_v4(), None).await,
                Err(CoreError::Forbidden(_))
            ));
            assert!(matches!(
                h.board.remove_collaborator(user, project.id, grace.id).await,
                Err(CoreError::Forbidden(_))
            ));
            assert!(matches!(
                h.board.create_task(user, project.id, CreateTask::titled("Sneaky")).await,
                Err(CoreError::Forbidden(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_missing_project_is_not_found_before_forbidden() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let missing = Uuid::new_v4();

        assert!(matches!(
            h.board.delete_project(ada.id, missing).await,
            Err(CoreError::NotFound { kind: EntityKind::Project, .. })
        ));
        assert!(matches!(
            h.board.get_project(ada.id, missing).await,
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_visibility_for_collaborators_only() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let grace = h.user("Grace").await;
        let eve = h.user("Eve").await;
        let project = h.project(&ada, "Launch").await;
        h.board
            .add_collaborator(ada.id, project.id, grace.id, Some("viewer".to_string()))
            .await
            .unwrap();

        assert!(h.board.get_project(grace.id, project.id).await.is_ok());
        assert!(matches!(
            h.board.get_project(eve.id, project.id).await,
            Err(CoreError::Forbidden(_))
        ));

        let listed = h.board.get_projects(grace.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(h.board.get_projects(eve.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let mut input = CreateProject::named("Launch");
        input.description = Some("Q3 launch".to_string());
        let project = h.board.create_project(ada.id, input).await.unwrap();

        let patch = ProjectPatch {
            status: Some(ProjectStatus::InProgress),
            ..Default::default()
        };
        let updated = h.board.update_project(ada.id, project.id, patch).await.unwrap();

        assert_eq!(updated.status, ProjectStatus::InProgress);
        assert_eq!(updated.name, "Launch");
        assert_eq!(updated.description.as_deref(), Some("Q3 launch"));
    }

    #[tokio::test]
    async fn test_update_rejects_inverted_dates() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let project = h.project(&ada, "Launch").await;
        let now = chrono::Utc::now();

        let patch = ProjectPatch {
            start_date: Some(Some(now)),
            due_date: Some(Some(now - chrono::Duration::days(1))),
            ..Default::default()
        };
        assert!(matches!(
            h.board.update_project(ada.id, project.id, patch).await,
            Err(CoreError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_tasks() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let project = h.project(&ada, "Launch").await;
        let task = h
            .board
            .create_task(ada.id, project.id, CreateTask::titled("Write copy"))
            .await
            .unwrap();
        h.board
            .update_task(
                ada.id,
                task.id,
                TaskPatch {
                    status: Some(crate::models::TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        h.board.delete_project(ada.id, project.id).await.unwrap();

        assert!(h.store.get_project(project.id).await.unwrap().is_none());
        assert!(h.store.get_task(task.id).await.unwrap().is_none());
        assert!(h.board.list_tasks_for_user(ada.id).await.unwrap().is_empty());
    }
}
