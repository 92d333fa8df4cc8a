/// Project model and database operations
///
/// A project is owned by the user who created it and holds an embedded,
/// ordered list of collaborators. `total_tasks` and `completed_tasks` are
/// derived counters written only by the count synchronizer; no input type in
/// this module accepts them.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_status AS ENUM ('planning', 'in_progress', 'completed');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     status project_status NOT NULL DEFAULT 'planning',
///     priority priority_level NOT NULL DEFAULT 'medium',
///     start_date TIMESTAMPTZ,
///     due_date TIMESTAMPTZ,
///     color VARCHAR(32) NOT NULL DEFAULT '#3b82f6',
///     total_tasks BIGINT NOT NULL DEFAULT 0,
///     completed_tasks BIGINT NOT NULL DEFAULT 0,
///     collaborators JSONB NOT NULL DEFAULT '[]',
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Collaborators live inside the project row so that adding or removing one
/// is a single-row atomic update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::common::Priority;

/// Default color assigned to new projects
pub const DEFAULT_PROJECT_COLOR: &str = "#3b82f6";

/// Project lifecycle status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planning,
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planning => "planning",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
        }
    }
}

/// Role carried by a collaborator entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaboratorRole {
    #[default]
    Editor,
    Viewer,
}

impl CollaboratorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollaboratorRole::Editor => "editor",
            CollaboratorRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for CollaboratorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollaboratorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "editor" => Ok(CollaboratorRole::Editor),
            "viewer" => Ok(CollaboratorRole::Viewer),
            other => Err(format!("unknown collaborator role: {:?}", other)),
        }
    }
}

/// One entry of a project's collaborator list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub user_id: Uuid,
    pub role: CollaboratorRole,
    pub added_at: DateTime<Utc>,
}

impl Collaborator {
    pub fn new(user_id: Uuid, role: CollaboratorRole) -> Self {
        Self {
            user_id,
            role,
            added_at: Utc::now(),
        }
    }
}

/// Project model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub color: String,

    /// Live count of tasks referencing this project (derived)
    pub total_tasks: i64,

    /// Live count of those tasks in status `completed` (derived)
    pub completed_tasks: i64,

    /// Ordered collaborator list, at most one entry per user
    pub collaborators: Vec<Collaborator>,

    /// Creator of the project, immutable
    pub owner_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape returned by Postgres
#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    status: ProjectStatus,
    priority: Priority,
    start_date: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    color: String,
    total_tasks: i64,
    completed_tasks: i64,
    collaborators: Json<Vec<Collaborator>>,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            status: row.status,
            priority: row.priority,
            start_date: row.start_date,
            due_date: row.due_date,
            color: row.color,
            total_tasks: row.total_tasks,
            completed_tasks: row.completed_tasks,
            collaborators: row.collaborators.0,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PROJECT_COLUMNS: &str = "id, name, description, status, priority, start_date, due_date, color, \
     total_tasks, completed_tasks, collaborators, owner_id, created_at, updated_at";

/// Input for creating a project
///
/// Counters always start at zero and are not part of this input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub color: String,
    pub owner_id: Uuid,
    pub collaborators: Vec<Collaborator>,
}

/// Partial update of a project
///
/// Only `Some` fields change. Nested options (`Some(None)`) clear the field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub color: Option<String>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.start_date.is_none()
            && self.due_date.is_none()
            && self.color.is_none()
    }

    /// Applies the patch to an in-memory project
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(priority) = self.priority {
            project.priority = priority;
        }
        if let Some(start_date) = self.start_date {
            project.start_date = start_date;
        }
        if let Some(due_date) = self.due_date {
            project.due_date = due_date;
        }
        if let Some(color) = &self.color {
            project.color = color.clone();
        }
    }
}

impl Project {
    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn collaborator(&self, user_id: Uuid) -> Option<&Collaborator> {
        self.collaborators.iter().find(|c| c.user_id == user_id)
    }

    pub fn is_collaborator(&self, user_id: Uuid) -> bool {
        self.collaborator(user_id).is_some()
    }

    /// Owner or collaborator
    pub fn has_access(&self, user_id: Uuid) -> bool {
        self.is_owner(user_id) || self.is_collaborator(user_id)
    }

    /// Owner followed by every collaborator, in list order
    pub fn participants(&self) -> Vec<Uuid> {
        std::iter::once(self.owner_id)
            .chain(self.collaborators.iter().map(|c| c.user_id))
            .collect()
    }

    /// Creates a project with zeroed counters
    pub async fn create(pool: &PgPool, data: NewProject) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO projects (name, description, status, priority, start_date, due_date,
                                  color, owner_id, collaborators)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        );

        let row = sqlx::query_as::<_, ProjectRow>(&query)
            .bind(data.name)
            .bind(data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.start_date)
            .bind(data.due_date)
            .bind(data.color)
            .bind(data.owner_id)
            .bind(Json(data.collaborators))
            .fetch_one(pool)
            .await?;

        Ok(row.into())
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS);

        let row = sqlx::query_as::<_, ProjectRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Lists projects the user owns or collaborates on, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM projects
            WHERE owner_id = $1
               OR collaborators @> jsonb_build_array(jsonb_build_object('user_id', $1::text))
            ORDER BY created_at DESC
            "#,
            PROJECT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ProjectRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Lists projects not yet completed whose due date falls in `[from, to]`
    pub async fn list_due_between(
        pool: &PgPool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM projects
            WHERE status <> 'completed'
              AND due_date IS NOT NULL
              AND due_date BETWEEN $1 AND $2
            ORDER BY due_date ASC
            "#,
            PROJECT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ProjectRow>(&query)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Applies a partial update
    ///
    /// Returns `None` if the project does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: ProjectPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if data.start_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", start_date = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }
        if data.color.is_some() {
            bind_count += 1;
            query.push_str(&format!(", color = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", PROJECT_COLUMNS));

        let mut q = sqlx::query_as::<_, ProjectRow>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(start_date) = data.start_date {
            q = q.bind(start_date);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }
        if let Some(color) = data.color {
            q = q.bind(color);
        }

        let row = q.fetch_optional(pool).await?;

        Ok(row.map(Into::into))
    }

    /// Deletes a project row. Tasks are removed separately by the caller.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Overwrites the derived task counters
    pub async fn set_task_counts(
        pool: &PgPool,
        id: Uuid,
        total: i64,
        completed: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET total_tasks = $2, completed_tasks = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(total)
        .bind(completed)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Appends a collaborator unless the user is already on the list
    ///
    /// The membership check and the append happen in one statement. Returns
    /// false when nothing was written (unknown project or duplicate user).
    pub async fn add_collaborator(
        pool: &PgPool,
        id: Uuid,
        collaborator: &Collaborator,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET collaborators = collaborators || jsonb_build_array($2::jsonb),
                updated_at = NOW()
            WHERE id = $1
              AND NOT collaborators @> jsonb_build_array(jsonb_build_object('user_id', $3::text))
            "#,
        )
        .bind(id)
        .bind(Json(collaborator))
        .bind(collaborator.user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every entry for `user_id`. Returns false when nothing changed.
    pub async fn remove_collaborator(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET collaborators = COALESCE(
                    (SELECT jsonb_agg(entry)
                     FROM jsonb_array_elements(collaborators) AS entry
                     WHERE entry->>'user_id' <> $2::text),
                    '[]'::jsonb),
                updated_at = NOW()
            WHERE id = $1
              AND collaborators @> jsonb_build_array(jsonb_build_object('user_id', $2::text))
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
