/// Task counter resync
///
/// `total_tasks` and `completed_tasks` on a project are derived. Every task
/// create, status change and delete recomputes both from the live task set
/// and overwrites them. The recompute is idempotent, so a stale value left by
/// an interleaving or a failed write is corrected by the next resync.

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::TaskCounts;
use crate::store::Store;

#[derive(Clone)]
pub struct CountSynchronizer {
    store: Arc<dyn Store>,
}

impl CountSynchronizer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Recomputes and writes the project's counters
    pub async fn resync(&self, project_id: Uuid) -> CoreResult<TaskCounts> {
        let counts = self
            .store
            .count_tasks(project_id)
            .await
            .map_err(CoreError::dependency("count resync"))?;

        let written = self
            .store
            .set_project_task_counts(project_id, counts.total, counts.completed)
            .await
            .map_err(CoreError::dependency("count resync"))?;

        if !written {
            debug!(project_id = %project_id, "Project gone, counters not written");
        }

        Ok(counts)
    }

    /// Like [`resync`](Self::resync), but logs and swallows failures
    pub async fn resync_or_log(&self, project_id: Uuid) -> Option<TaskCounts> {
        match self.resync(project_id).await {
            Ok(counts) => Some(counts),
            Err(e) => {
                warn!(project_id = %project_id, error = %e, "Task count resync failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::DEFAULT_PROJECT_COLOR;
    use crate::models::{NewProject, NewTask, Priority, ProjectStatus, TaskPatch, TaskStatus};
    use crate::store::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let project = store
            .create_project(NewProject {
                name: "Launch".to_string(),
                description: None,
                status: ProjectStatus::Planning,
                priority: Priority::Medium,
                start_date: None,
                due_date: None,
                color: DEFAULT_PROJECT_COLOR.to_string(),
                owner_id: owner,
                collaborators: Vec::new(),
            })
            .await
            .unwrap();
        (store, project.id, owner)
    }

    fn new_task(project_id: Uuid, owner_id: Uuid) -> NewTask {
        NewTask {
            project_id,
            title: "Write copy".to_string(),
            description: None,
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_date: None,
            assigned_to: Vec::new(),
            owner_id,
        }
    }

    #[tokio::test]
    async fn test_resync_heals_stale_counters() {
        let (store, project_id, owner) = setup().await;
        let sync = CountSynchronizer::new(store.clone());

        let task = store.create_task(new_task(project_id, owner)).await.unwrap();
        store.create_task(new_task(project_id, owner)).await.unwrap();
        store
            .update_task(
                task.id,
                TaskPatch {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Counters were never written for these tasks
        let project = store.get_project(project_id).await.unwrap().unwrap();
        assert_eq!(project.total_tasks, 0);

        sync.resync(project_id).await.unwrap();
        let project = store.get_project(project_id).await.unwrap().unwrap();
        assert_eq!((project.total_tasks, project.completed_tasks), (2, 1));

        // Idempotent
        sync.resync(project_id).await.unwrap();
        let project = store.get_project(project_id).await.unwrap().unwrap();
        assert_eq!((project.total_tasks, project.completed_tasks), (2, 1));
    }

    #[tokio::test]
    async fn test_resync_failure_is_swallowed() {
        let (store, project_id, owner) = setup().await;
        let sync = CountSynchronizer::new(store.clone());
        store.create_task(new_task(project_id, owner)).await.unwrap();

        store.fail_task_counts(true);
        assert!(sync.resync_or_log(project_id).await.is_none());

        store.fail_task_counts(false);
        assert_eq!(sync.resync_or_log(project_id).await.map(|c| c.total), Some(1));
    }
}
