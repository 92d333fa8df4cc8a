/// Collaborator registry
///
/// Collaborators live inside the project document. Each add or remove is a
/// single conditional write, so the list never holds a user twice even when
/// two adds for the same user race.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use super::activity::{ActivityEntry, EntityRef};
use super::chat::WelcomeMessage;
use super::effects::FollowUp;
use super::fanout::{display_name, DomainEvent, ProjectRef};
use super::projects::parse_role;
use super::Planboard;
use crate::auth::authorization::{authorize_owner, require_found, require_project_access};
use crate::error::{CoreError, CoreResult};
use crate::models::{ActivityAction, Collaborator, CollaboratorRole, EntityKind, Project, UserSummary};

/// Collaborator entry with the user resolved, when it still exists
#[derive(Debug, Clone, Serialize)]
pub struct CollaboratorView {
    pub user_id: Uuid,
    pub role: CollaboratorRole,
    pub added_at: DateTime<Utc>,
    pub user: Option<UserSummary>,
}

impl Planboard {
    /// Appends a collaborator; owner-only
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` for a malformed role or when `user_id` is the owner
    /// - `AlreadyExists` when the user is already listed, whatever the role
    pub async fn add_collaborator(
        &self,
        requester_id: Uuid,
        project_id: Uuid,
        user_id: Uuid,
        role: Option<String>,
    ) -> CoreResult<Project> {
        let project = authorize_owner(
            requester_id,
            EntityKind::Project,
            project_id,
            self.load_project(project_id).await?,
        )?;

        let role = parse_role(role.as_deref())?;
        if project.is_owner(user_id) {
            return Err(CoreError::ValidationFailed(
                "the project owner cannot be added as a collaborator".to_string(),
            ));
        }
        if project.is_collaborator(user_id) {
            return Err(already_collaborator(user_id));
        }

        let entry = Collaborator::new(user_id, role);
        if !self.store.add_collaborator(project_id, &entry).await? {
            // Lost a race: either the project went away or the user got in first
            let current = self.reload_project(project_id).await?;
            debug!(project_id = %current.id, user_id = %user_id, "Concurrent collaborator add");
            return Err(already_collaborator(user_id));
        }

        let mut expected = project;
        expected.collaborators.push(entry);
        let project = self.settled_project(project_id, expected).await;
        info!(project_id = %project_id, user_id = %user_id, role = role.as_str(), "Collaborator added");

        let collaborator_name = display_name(self.store.as_ref(), user_id).await;
        let follow_up = FollowUp::new()
            .record(
                ActivityEntry::new(requester_id, ActivityAction::AddedCollaborator, EntityRef::from(&project))
                    .in_project(project.id)
                    .with_metadata(json!({ "user_id": user_id, "role": role.as_str() })),
            )
            .notify(
                requester_id,
                DomainEvent::CollaboratorAdded {
                    project: ProjectRef::from(&project),
                    collaborator: user_id,
                    role,
                },
            )
            .welcome(WelcomeMessage::collaborator_joined(
                project.id,
                &project.name,
                &collaborator_name,
                project.participants(),
            ));
        self.effects.dispatch(follow_up).await;

        Ok(project)
    }

    /// Removes a collaborator by user id; owner-only
    ///
    /// Removing a user who is not listed succeeds and changes nothing.
    pub async fn remove_collaborator(
        &self,
        requester_id: Uuid,
        project_id: Uuid,
        user_id: Uuid,
    ) -> CoreResult<Project> {
        let project = authorize_owner(
            requester_id,
            EntityKind::Project,
            project_id,
            self.load_project(project_id).await?,
        )?;

        if !project.is_collaborator(user_id) {
            return Ok(project);
        }

        let removed = self.store.remove_collaborator(project_id, user_id).await?;
        let mut expected = project;
        expected.collaborators.retain(|c| c.user_id != user_id);
        let project = self.settled_project(project_id, expected).await;

        if removed {
            info!(project_id = %project_id, user_id = %user_id, "Collaborator removed");
            self.effects
                .dispatch(FollowUp::new().record(
                    ActivityEntry::new(
                        requester_id,
                        ActivityAction::RemovedCollaborator,
                        EntityRef::from(&project),
                    )
                    .in_project(project.id)
                    .with_metadata(json!({ "user_id": user_id })),
                ))
                .await;
        }

        Ok(project)
    }

    /// Collaborators in insertion order with their user records
    pub async fn list_collaborators(
        &self,
        requester_id: Uuid,
        project_id: Uuid,
    ) -> CoreResult<Vec<CollaboratorView>> {
        let project = require_found(
            EntityKind::Project,
            project_id,
            self.load_project(project_id).await?,
        )?;
        require_project_access(requester_id, &project)?;

        let mut views = Vec::with_capacity(project.collaborators.len());
        for entry in project.collaborators {
            let user = self.store.get_user(entry.user_id).await?;
            views.push(CollaboratorView {
                user_id: entry.user_id,
                role: entry.role,
                added_at: entry.added_at,
                user: user.as_ref().map(UserSummary::from),
            });
        }

        Ok(views)
    }
}

fn already_collaborator(user_id: Uuid) -> CoreError {
    CoreError::AlreadyExists(format!("user {} is already a collaborator", user_id))
}
