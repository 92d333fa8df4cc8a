/// Activity feed reads

use uuid::Uuid;

use super::Planboard;
use crate::auth::authorization::{require_found, require_project_access};
use crate::error::CoreResult;
use crate::models::{Activity, EntityKind};

pub const DEFAULT_FEED_LIMIT: i64 = 50;
pub const MAX_FEED_LIMIT: i64 = 200;

fn feed_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT)
}

impl Planboard {
    /// A project's activity, newest first; owner and collaborators only
    pub async fn list_activities(
        &self,
        requester_id: Uuid,
        project_id: Uuid,
        limit: Option<i64>,
    ) -> CoreResult<Vec<Activity>> {
        let project = require_found(
            EntityKind::Project,
            project_id,
            self.load_project(project_id).await?,
        )?;
        require_project_access(requester_id, &project)?;

        Ok(self
            .store
            .list_activities_by_project(project_id, feed_limit(limit))
            .await?)
    }

    /// The requester's own actions, newest first
    pub async fn list_user_activities(
        &self,
        requester_id: Uuid,
        limit: Option<i64>,
    ) -> CoreResult<Vec<Activity>> {
        Ok(self
            .store
            .list_activities_by_actor(requester_id, feed_limit(limit))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::models::ActivityAction;
    use crate::services::testing::Harness;
    use crate::services::CreateTask;

    #[tokio::test]
    async fn test_project_feed_newest_first() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let project = h.project(&ada, "Launch").await;
        h.board
            .create_task(ada.id, project.id, CreateTask::titled("Write copy"))
            .await
            .unwrap();

        let feed = h.board.list_activities(ada.id, project.id, None).await.unwrap();
        let actions: Vec<ActivityAction> = feed.iter().map(|a| a.action).collect();
        assert_eq!(
            actions,
            vec![ActivityAction::CreatedTask, ActivityAction::CreatedProject]
        );
        assert_eq!(feed[0].description, "created task \"Write copy\"");

        let limited = h.board.list_activities(ada.id, project.id, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_project_feed_requires_access() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let eve = h.user("Eve").await;
        let project = h.project(&ada, "Launch").await;

        assert!(matches!(
            h.board.list_activities(eve.id, project.id, None).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            h.board.list_activities(ada.id, Uuid::new_v4(), None).await,
            Err(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_user_feed_only_contains_own_actions() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let grace = h.user("Grace").await;
        h.project(&ada, "Launch").await;
        h.project(&grace, "Docs").await;

        let feed = h.board.list_user_activities(ada.id, None).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert!(feed.iter().all(|a| a.actor_id == ada.id));
    }
}
