/// Notification model and database operations
///
/// Notifications are written only by the notification fan-out, belong to
/// their recipient, and after creation only `is_read` changes.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE notification_type AS ENUM (
///     'task_assigned', 'task_completed', 'task_commented', 'mention',
///     'project_invite', 'collaborator_added', 'deadline_approaching'
/// );
///
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     recipient_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     message TEXT NOT NULL,
///     notification_type notification_type NOT NULL,
///     priority priority_level NOT NULL DEFAULT 'medium',
///     action_by UUID,
///     related_entity_id UUID,
///     related_entity_kind entity_kind,
///     action_url VARCHAR(512),
///     metadata JSONB,
///     is_read BOOLEAN NOT NULL DEFAULT FALSE,
///     read_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use super::common::{EntityKind, Priority};

/// Tag naming the event that produced a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TaskAssigned,
    TaskCompleted,
    TaskCommented,
    Mention,
    ProjectInvite,
    CollaboratorAdded,
    DeadlineApproaching,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TaskAssigned => "task_assigned",
            NotificationType::TaskCompleted => "task_completed",
            NotificationType::TaskCommented => "task_commented",
            NotificationType::Mention => "mention",
            NotificationType::ProjectInvite => "project_invite",
            NotificationType::CollaboratorAdded => "collaborator_added",
            NotificationType::DeadlineApproaching => "deadline_approaching",
        }
    }
}

/// Entity a notification points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub id: Uuid,
    pub kind: EntityKind,
}

/// Notification model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,

    #[serde(rename = "type")]
    pub notification_type: NotificationType,

    pub priority: Priority,

    /// User whose action triggered the notification
    pub action_by: Option<Uuid>,

    pub related_entity_id: Option<Uuid>,
    pub related_entity_kind: Option<EntityKind>,
    pub action_url: Option<String>,
    pub metadata: Option<JsonValue>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn related_entity(&self) -> Option<RelatedEntity> {
        match (self.related_entity_id, self.related_entity_kind) {
            (Some(id), Some(kind)) => Some(RelatedEntity { id, kind }),
            _ => None,
        }
    }
}

/// Input for creating a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: Priority,
    pub action_by: Option<Uuid>,
    pub related_entity: Option<RelatedEntity>,
    pub action_url: Option<String>,
    pub metadata: Option<JsonValue>,
}

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, title, message, notification_type, priority, \
     action_by, related_entity_id, related_entity_kind, action_url, metadata, is_read, read_at, created_at";

impl Notification {
    /// Creates an unread notification
    pub async fn create(pool: &PgPool, data: NewNotification) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO notifications (recipient_id, title, message, notification_type, priority,
                                       action_by, related_entity_id, related_entity_kind,
                                       action_url, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(data.recipient_id)
            .bind(data.title)
            .bind(data.message)
            .bind(data.notification_type)
            .bind(data.priority)
            .bind(data.action_by)
            .bind(data.related_entity.map(|e| e.id))
            .bind(data.related_entity.map(|e| e.kind))
            .bind(data.action_url)
            .bind(data.metadata)
            .fetch_one(pool)
            .await
    }

    /// Finds a notification by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM notifications WHERE id = $1", NOTIFICATION_COLUMNS);

        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a recipient's notifications, newest first
    pub async fn list_for_recipient(
        pool: &PgPool,
        recipient_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM notifications
            WHERE recipient_id = $1
              AND ($2 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(recipient_id)
            .bind(unread_only)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Flips `is_read` to true, keeping the first read timestamp
    pub async fn mark_read(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = COALESCE(read_at, NOW())
            WHERE id = $1
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Marks every unread notification of a recipient as read
    pub async fn mark_all_read(pool: &PgPool, recipient_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = NOW()
            WHERE recipient_id = $1 AND is_read = FALSE
            "#,
        )
        .bind(recipient_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a notification
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts a recipient's unread notifications
    pub async fn count_unread(pool: &PgPool, recipient_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Whether a notification of this type about this entity was sent to the
    /// recipient at or after `since`
    pub async fn exists_since(
        pool: &PgPool,
        recipient_id: Uuid,
        notification_type: NotificationType,
        related_entity_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM notifications
                WHERE recipient_id = $1
                  AND notification_type = $2
                  AND related_entity_id = $3
                  AND created_at >= $4
            )
            "#,
        )
        .bind(recipient_id)
        .bind(notification_type)
        .bind(related_entity_id)
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Deletes read notifications created before `cutoff`
    pub async fn delete_read_before(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE is_read = TRUE AND created_at < $1",
        )
        .bind(cutoff)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_serialized_as_type_field() {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            title: "New task assigned".to_string(),
            message: "Ada assigned you to \"Write copy\"".to_string(),
            notification_type: NotificationType::TaskAssigned,
            priority: Priority::Medium,
            action_by: None,
            related_entity_id: None,
            related_entity_kind: None,
            action_url: None,
            metadata: None,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "task_assigned");
        assert_eq!(json["priority"], "medium");
        assert!(notification.related_entity().is_none());
    }

    #[test]
    fn test_type_labels() {
        assert_eq!(NotificationType::DeadlineApproaching.as_str(), "deadline_approaching");
        let json = serde_json::to_string(&NotificationType::ProjectInvite).unwrap();
        assert_eq!(json, "\"project_invite\"");
    }
}
