/// Activity recorder

use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::activity::describe;
use crate::models::{Activity, ActivityAction, EntityKind, NewActivity, Project, Task};
use crate::store::Store;

/// Entity an activity is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: Uuid,
    pub name: String,
}

impl From<&Project> for EntityRef {
    fn from(project: &Project) -> Self {
        Self {
            kind: EntityKind::Project,
            id: project.id,
            name: project.name.clone(),
        }
    }
}

impl From<&Task> for EntityRef {
    fn from(task: &Task) -> Self {
        Self {
            kind: EntityKind::Task,
            id: task.id,
            name: task.title.clone(),
        }
    }
}

/// One pending activity record
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub actor_id: Uuid,
    pub action: ActivityAction,
    pub entity: EntityRef,
    pub project_id: Option<Uuid>,
    pub metadata: Option<JsonValue>,
}

impl ActivityEntry {
    pub fn new(actor_id: Uuid, action: ActivityAction, entity: EntityRef) -> Self {
        Self {
            actor_id,
            action,
            entity,
            project_id: None,
            metadata: None,
        }
    }

    pub fn in_project(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Appends entries to the activity log
#[derive(Clone)]
pub struct ActivityRecorder {
    store: Arc<dyn Store>,
}

impl ActivityRecorder {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn record(&self, entry: ActivityEntry) -> CoreResult<Activity> {
        let description = describe(entry.action, entry.entity.kind, &entry.entity.name);

        self.store
            .create_activity(NewActivity {
                actor_id: entry.actor_id,
                action: entry.action,
                entity_kind: entry.entity.kind,
                entity_id: entry.entity.id,
                entity_name: entry.entity.name,
                project_id: entry.project_id,
                description,
                metadata: entry.metadata,
            })
            .await
            .map_err(CoreError::dependency("activity record"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_record_derives_description() {
        let store = Arc::new(MemoryStore::new());
        let recorder = ActivityRecorder::new(store.clone());
        let actor = Uuid::new_v4();
        let project_id = Uuid::new_v4();

        let entry = ActivityEntry::new(
            actor,
            ActivityAction::CreatedTask,
            EntityRef {
                kind: EntityKind::Task,
                id: Uuid::new_v4(),
                name: "Write copy".to_string(),
            },
        )
        .in_project(project_id);

        let activity = recorder.record(entry).await.unwrap();
        assert_eq!(activity.description, "created task \"Write copy\"");
        assert_eq!(activity.project_id, Some(project_id));

        let listed = store.list_activities_by_project(project_id, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_record_failure_is_dependency_failure() {
        let store = Arc::new(MemoryStore::new());
        store.fail_activities(true);
        let recorder = ActivityRecorder::new(store);

        let entry = ActivityEntry::new(
            Uuid::new_v4(),
            ActivityAction::DeletedProject,
            EntityRef {
                kind: EntityKind::Project,
                id: Uuid::new_v4(),
                name: "Launch".to_string(),
            },
        );

        let err = recorder.record(entry).await.unwrap_err();
        assert!(matches!(err, CoreError::DependencyFailure { .. }));
    }
}
