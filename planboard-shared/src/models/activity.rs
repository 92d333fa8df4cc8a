/// Activity log model and database operations
///
/// The activity log is append-only. Rows are written by the operation that
/// triggered them and are never updated or deleted by normal flows.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE activity_action AS ENUM (
///     'created_project', 'updated_project', 'deleted_project',
///     'added_collaborator', 'removed_collaborator',
///     'created_task', 'updated_task', 'completed_task', 'deleted_task',
///     'assigned_task', 'commented'
/// );
///
/// CREATE TABLE activities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     actor_id UUID NOT NULL,
///     action activity_action NOT NULL,
///     entity_kind entity_kind NOT NULL,
///     entity_id UUID NOT NULL,
///     entity_name VARCHAR(255) NOT NULL,
///     project_id UUID,
///     description TEXT NOT NULL,
///     metadata JSONB,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::fmt;
use uuid::Uuid;

use super::common::EntityKind;

/// Closed set of recorded actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    CreatedProject,
    UpdatedProject,
    DeletedProject,
    AddedCollaborator,
    RemovedCollaborator,
    CreatedTask,
    UpdatedTask,
    CompletedTask,
    DeletedTask,
    AssignedTask,
    Commented,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::CreatedProject => "created_project",
            ActivityAction::UpdatedProject => "updated_project",
            ActivityAction::DeletedProject => "deleted_project",
            ActivityAction::AddedCollaborator => "added_collaborator",
            ActivityAction::RemovedCollaborator => "removed_collaborator",
            ActivityAction::CreatedTask => "created_task",
            ActivityAction::UpdatedTask => "updated_task",
            ActivityAction::CompletedTask => "completed_task",
            ActivityAction::DeletedTask => "deleted_task",
            ActivityAction::AssignedTask => "assigned_task",
            ActivityAction::Commented => "commented",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds the human-readable description of an activity
///
/// Derived only from the action, the entity kind and the entity name. Pairs
/// without a dedicated template fall back to `performed <action>`.
pub fn describe(action: ActivityAction, kind: EntityKind, name: &str) -> String {
    use ActivityAction::*;

    match (action, kind) {
        (CreatedProject, EntityKind::Project) => format!("created project \"{}\"", name),
        (UpdatedProject, EntityKind::Project) => format!("updated project \"{}\"", name),
        (DeletedProject, EntityKind::Project) => format!("deleted project \"{}\"", name),
        (AddedCollaborator, EntityKind::Project) => {
            format!("added a collaborator to \"{}\"", name)
        }
        (RemovedCollaborator, EntityKind::Project) => {
            format!("removed a collaborator from \"{}\"", name)
        }
        (CreatedTask, EntityKind::Task) => format!("created task \"{}\"", name),
        (UpdatedTask, EntityKind::Task) => format!("updated task \"{}\"", name),
        (CompletedTask, EntityKind::Task) => format!("completed task \"{}\"", name),
        (DeletedTask, EntityKind::Task) => format!("deleted task \"{}\"", name),
        (AssignedTask, EntityKind::Task) => format!("assigned task \"{}\"", name),
        (Commented, EntityKind::Task) => format!("commented on \"{}\"", name),
        (action, _) => format!("performed {}", action),
    }
}

/// Activity log entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: ActivityAction,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub project_id: Option<Uuid>,
    pub description: String,
    pub metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending an activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
    pub actor_id: Uuid,
    pub action: ActivityAction,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub entity_name: String,
    pub project_id: Option<Uuid>,
    pub description: String,
    pub metadata: Option<JsonValue>,
}

const ACTIVITY_COLUMNS: &str = "id, actor_id, action, entity_kind, entity_id, entity_name, \
     project_id, description, metadata, created_at";

impl Activity {
    /// Appends an activity
    pub async fn create(pool: &PgPool, data: NewActivity) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO activities (actor_id, action, entity_kind, entity_id, entity_name,
                                    project_id, description, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            ACTIVITY_COLUMNS
        );

        sqlx::query_as::<_, Activity>(&query)
            .bind(data.actor_id)
            .bind(data.action)
            .bind(data.entity_kind)
            .bind(data.entity_id)
            .bind(data.entity_name)
            .bind(data.project_id)
            .bind(data.description)
            .bind(data.metadata)
            .fetch_one(pool)
            .await
    }

    /// Lists a project's activity, newest first
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM activities
            WHERE project_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            ACTIVITY_COLUMNS
        );

        sqlx::query_as::<_, Activity>(&query)
            .bind(project_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Lists a user's own activity, newest first
    pub async fn list_by_actor(
        pool: &PgPool,
        actor_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM activities
            WHERE actor_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            ACTIVITY_COLUMNS
        );

        sqlx::query_as::<_, Activity>(&query)
            .bind(actor_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_known_pairs() {
        assert_eq!(
            describe(ActivityAction::CreatedProject, EntityKind::Project, "Launch"),
            "created project \"Launch\""
        );
        assert_eq!(
            describe(ActivityAction::CompletedTask, EntityKind::Task, "Write copy"),
            "completed task \"Write copy\""
        );
        assert_eq!(
            describe(ActivityAction::Commented, EntityKind::Task, "Write copy"),
            "commented on \"Write copy\""
        );
    }

    #[test]
    fn test_describe_fallback() {
        assert_eq!(
            describe(ActivityAction::CompletedTask, EntityKind::Project, "Launch"),
            "performed completed_task"
        );
        assert_eq!(
            describe(ActivityAction::Commented, EntityKind::Comment, "x"),
            "performed commented"
        );
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&ActivityAction::AddedCollaborator).unwrap();
        assert_eq!(json, "\"added_collaborator\"");
    }
}
