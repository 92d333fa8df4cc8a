/// Notification inbox
///
/// A notification belongs to its recipient. Nobody else can read, flip or
/// delete it.

use tracing::debug;
use uuid::Uuid;

use super::Planboard;
use crate::error::{CoreError, CoreResult};
use crate::models::{EntityKind, Notification};

pub const DEFAULT_INBOX_LIMIT: i64 = 50;
pub const MAX_INBOX_LIMIT: i64 = 100;

/// Clamps a requested page size into `1..=MAX_INBOX_LIMIT`
pub fn inbox_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_INBOX_LIMIT).clamp(1, MAX_INBOX_LIMIT)
}

impl Planboard {
    async fn owned_notification(
        &self,
        requester_id: Uuid,
        notification_id: Uuid,
    ) -> CoreResult<Notification> {
        let notification = self
            .store
            .get_notification(notification_id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Notification, notification_id))?;

        if notification.recipient_id != requester_id {
            return Err(CoreError::Forbidden(
                "notification belongs to another user".to_string(),
            ));
        }

        Ok(notification)
    }

    /// Newest first
    pub async fn list_notifications(
        &self,
        requester_id: Uuid,
        unread_only: bool,
        limit: Option<i64>,
    ) -> CoreResult<Vec<Notification>> {
        Ok(self
            .store
            .list_notifications(requester_id, unread_only, inbox_limit(limit))
            .await?)
    }

    /// Marks one notification read; marking twice keeps the first `read_at`
    pub async fn mark_notification_read(
        &self,
        requester_id: Uuid,
        notification_id: Uuid,
    ) -> CoreResult<Notification> {
        self.owned_notification(requester_id, notification_id).await?;

        self.store
            .mark_notification_read(notification_id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Notification, notification_id))
    }

    /// Returns how many notifications flipped to read
    pub async fn mark_all_notifications_read(&self, requester_id: Uuid) -> CoreResult<u64> {
        let updated = self.store.mark_all_notifications_read(requester_id).await?;
        debug!(user_id = %requester_id, updated, "Marked all notifications read");
        Ok(updated)
    }

    pub async fn delete_notification(
        &self,
        requester_id: Uuid,
        notification_id: Uuid,
    ) -> CoreResult<()> {
        self.owned_notification(requester_id, notification_id).await?;
        self.store.delete_notification(notification_id).await?;
        Ok(())
    }

    pub async fn get_unread_count(&self, requester_id: Uuid) -> CoreResult<i64> {
        Ok(self.store.count_unread_notifications(requester_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::Harness;

    async fn seeded() -> (Harness, crate::models::User, crate::models::User) {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let grace = h.user("Grace").await;
        for name in ["Launch", "Docs", "Site"] {
            let project = h.project(&ada, name).await;
            h.board
                .add_collaborator(ada.id, project.id, grace.id, None)
                .await
                .unwrap();
        }
        (h, ada, grace)
    }

    #[test]
    fn test_limit_clamping() {
        assert_eq!(inbox_limit(None), DEFAULT_INBOX_LIMIT);
        assert_eq!(inbox_limit(Some(0)), 1);
        assert_eq!(inbox_limit(Some(500)), MAX_INBOX_LIMIT);
        assert_eq!(inbox_limit(Some(7)), 7);
    }

    #[tokio::test]
    async fn test_unread_lifecycle() {
        let (h, _ada, grace) = seeded().await;

        assert_eq!(h.board.get_unread_count(grace.id).await.unwrap(), 3);
        let inbox = h.board.list_notifications(grace.id, false, Some(2)).await.unwrap();
        assert_eq!(inbox.len(), 2);

        let first = h
            .board
            .mark_notification_read(grace.id, inbox[0].id)
            .await
            .unwrap();
        assert!(first.is_read);
        let again = h
            .board
            .mark_notification_read(grace.id, inbox[0].id)
            .await
            .unwrap();
        assert_eq!(again.read_at, first.read_at);

        assert_eq!(h.board.get_unread_count(grace.id).await.unwrap(), 2);
        let unread = h.board.list_notifications(grace.id, true, None).await.unwrap();
        assert_eq!(unread.len(), 2);

        assert_eq!(h.board.mark_all_notifications_read(grace.id).await.unwrap(), 2);
        assert_eq!(h.board.get_unread_count(grace.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_recipient_only_access() {
        let (h, ada, grace) = seeded().await;
        let inbox = h.board.list_notifications(grace.id, false, None).await.unwrap();
        let target = inbox[0].id;

        assert!(matches!(
            h.board.mark_notification_read(ada.id, target).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            h.board.delete_notification(ada.id, target).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            h.board.delete_notification(grace.id, Uuid::new_v4()).await,
            Err(CoreError::NotFound { .. })
        ));

        h.board.delete_notification(grace.id, target).await.unwrap();
        assert_eq!(h.board.get_unread_count(grace.id).await.unwrap(), 2);
    }
}
