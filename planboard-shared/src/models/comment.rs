/// Task comment model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL,
///     project_id UUID NOT NULL,
///     author_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     mentions UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Maximum comment length in characters
pub const MAX_COMMENT_LENGTH: usize = 2000;

/// Comment on a task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub content: String,

    /// Users mentioned in the comment, without duplicates
    pub mentions: Vec<Uuid>,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub task_id: Uuid,

    /// Required; a comment without a project reference is rejected
    pub project_id: Option<Uuid>,

    pub author_id: Uuid,
    pub content: String,
    pub mentions: Vec<Uuid>,
}

impl NewComment {
    /// Checks required fields, returning a message for the first violation
    pub fn validate(&self) -> Result<(), String> {
        if self.project_id.is_none() {
            return Err("comment must reference a project".to_string());
        }
        let length = self.content.trim().chars().count();
        if length == 0 {
            return Err("comment content must not be empty".to_string());
        }
        if length > MAX_COMMENT_LENGTH {
            return Err(format!(
                "comment content must be at most {} characters",
                MAX_COMMENT_LENGTH
            ));
        }
        Ok(())
    }
}

impl Comment {
    /// Creates a comment
    ///
    /// Callers validate first; a missing project id is rejected by the
    /// NOT NULL constraint.
    pub async fn create(pool: &PgPool, data: NewComment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, project_id, author_id, content, mentions)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, task_id, project_id, author_id, content, mentions, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.project_id)
        .bind(data.author_id)
        .bind(data.content)
        .bind(data.mentions)
        .fetch_one(pool)
        .await
    }

    /// Lists the comments of a task, oldest first
    pub async fn list_by_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, project_id, author_id, content, mentions, created_at
            FROM comments
            WHERE task_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes the comments of a task
    pub async fn delete_by_task(pool: &PgPool, task_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE task_id = $1")
            .bind(task_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Deletes the comments of every task in a project
    pub async fn delete_by_project(pool: &PgPool, project_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE project_id = $1")
            .bind(project_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
