/// The project/task consistency engine
///
/// [`Planboard`] exposes every public operation. Each mutation runs
/// authorize → mutate → resync counters → follow-up (activity, notifications,
/// chat). Only single-document writes are atomic; counters are re-derived on
/// every relevant task change, which makes them converge after interleavings.
///
/// # Modules
///
/// - `projects`, `collaborators`, `tasks`, `comments`: owner-guarded operations
/// - `inbox`, `feed`: notification and activity reads
/// - `maintenance`: deadline reminders and notification retention
/// - `fanout`, `activity`, `counts`, `chat`, `effects`: side-effect plumbing

pub mod activity;
pub mod chat;
pub mod collaborators;
pub mod comments;
pub mod counts;
pub mod effects;
pub mod fanout;
pub mod feed;
pub mod inbox;
pub mod maintenance;
pub mod projects;
pub mod tasks;

use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{EntityKind, Project, Task};
use crate::store::Store;
use chat::ChatNotifier;
use effects::{EffectMode, Effects};

pub use collaborators::CollaboratorView;
pub use comments::AddComment;
pub use maintenance::DeadlineScan;
pub use projects::{CollaboratorInput, CreateProject};
pub use tasks::{CreateTask, URGENT_LIMIT, URGENT_WINDOW_DAYS};

/// Entry point of the engine
#[derive(Clone)]
pub struct Planboard {
    store: Arc<dyn Store>,
    effects: Effects,
}

impl Planboard {
    pub fn new(store: Arc<dyn Store>, chat: Arc<dyn ChatNotifier>, mode: EffectMode) -> Self {
        let effects = Effects::new(store.clone(), chat, mode);
        Self { store, effects }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Store connectivity
    pub async fn health(&self) -> CoreResult<()> {
        Ok(self.store.ping().await?)
    }

    async fn load_project(&self, id: Uuid) -> CoreResult<Option<Project>> {
        Ok(self.store.get_project(id).await?)
    }

    async fn load_task(&self, id: Uuid) -> CoreResult<Option<Task>> {
        Ok(self.store.get_task(id).await?)
    }

    /// Reloads a project after a write; absent means it was deleted meanwhile
    async fn reload_project(&self, id: Uuid) -> CoreResult<Project> {
        self.load_project(id)
            .await?
            .ok_or_else(|| CoreError::not_found(EntityKind::Project, id))
    }

    /// Reads a project back once a write has committed. The write stands
    /// either way, so a failed or empty read yields `fallback` instead of an
    /// error.
    async fn settled_project(&self, id: Uuid, fallback: Project) -> Project {
        match self.load_project(id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                warn!(project_id = %id, "Project vanished after write");
                fallback
            }
            Err(e) => {
                warn!(project_id = %id, error = %e, "Project reload failed after write");
                fallback
            }
        }
    }
}

fn require_text(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::ValidationFailed(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Removes repeated ids, keeping first occurrences in order
fn dedup_ids(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
