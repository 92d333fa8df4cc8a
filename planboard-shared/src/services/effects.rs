/// Side effects that follow a primary write
///
/// Order within one operation: authorize, mutate, resync counters, then
/// record activity and fan out notifications. Counter resync is awaited so a
/// successful response already carries converged counters; activity,
/// notifications and chat run as a [`FollowUp`], either awaited in place
/// ([`EffectMode::Inline`]) or spawned onto the runtime
/// ([`EffectMode::Detached`]). Every failure is logged and dropped.

use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::activity::{ActivityEntry, ActivityRecorder};
use super::chat::{ChatNotifier, WelcomeMessage};
use super::counts::CountSynchronizer;
use super::fanout::{DomainEvent, NotificationFanout};
use crate::models::TaskCounts;
use crate::store::Store;

/// How follow-up effects are run relative to the request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EffectMode {
    /// Spawned; the caller returns before they finish
    #[default]
    Detached,
    /// Awaited before the operation returns
    Inline,
}

impl FromStr for EffectMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detached" => Ok(EffectMode::Detached),
            "inline" => Ok(EffectMode::Inline),
            other => Err(format!("unknown side-effect mode: {}", other)),
        }
    }
}

/// Best-effort work queued by one operation
#[derive(Debug, Default)]
pub struct FollowUp {
    activities: Vec<ActivityEntry>,
    events: Vec<(Option<Uuid>, DomainEvent)>,
    welcome: Option<WelcomeMessage>,
}

impl FollowUp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(mut self, entry: ActivityEntry) -> Self {
        self.activities.push(entry);
        self
    }

    pub fn notify(mut self, actor_id: Uuid, event: DomainEvent) -> Self {
        self.events.push((Some(actor_id), event));
        self
    }

    pub fn welcome(mut self, message: WelcomeMessage) -> Self {
        self.welcome = Some(message);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty() && self.events.is_empty() && self.welcome.is_none()
    }
}

#[derive(Clone)]
pub struct Effects {
    counts: CountSynchronizer,
    recorder: ActivityRecorder,
    fanout: NotificationFanout,
    chat: Arc<dyn ChatNotifier>,
    mode: EffectMode,
}

impl Effects {
    pub fn new(store: Arc<dyn Store>, chat: Arc<dyn ChatNotifier>, mode: EffectMode) -> Self {
        Self {
            counts: CountSynchronizer::new(store.clone()),
            recorder: ActivityRecorder::new(store.clone()),
            fanout: NotificationFanout::new(store),
            chat,
            mode,
        }
    }

    pub fn mode(&self) -> EffectMode {
        self.mode
    }

    pub fn fanout(&self) -> &NotificationFanout {
        &self.fanout
    }

    /// Resyncs a project's counters; failures are logged, never returned
    pub async fn resync_counts(&self, project_id: Uuid) -> Option<TaskCounts> {
        self.counts.resync_or_log(project_id).await
    }

    /// Runs or spawns the follow-up according to the configured mode
    pub async fn dispatch(&self, follow_up: FollowUp) {
        if follow_up.is_empty() {
            return;
        }

        match self.mode {
            EffectMode::Inline => self.run(follow_up).await,
            EffectMode::Detached => {
                let effects = self.clone();
                tokio::spawn(async move {
                    effects.run(follow_up).await;
                });
            }
        }
    }

    async fn run(&self, follow_up: FollowUp) {
        for entry in follow_up.activities {
            let action = entry.action;
            let entity_id = entry.entity.id;
            if let Err(e) = self.recorder.record(entry).await {
                warn!(
                    action = action.as_str(),
                    entity_id = %entity_id,
                    error = %e,
                    "Activity not recorded"
                );
            }
        }

        for (actor_id, event) in follow_up.events {
            self.fanout.notify(actor_id, &event).await;
        }

        if let Some(message) = follow_up.welcome {
            let project_id = message.project_id;
            if let Err(e) = self.chat.send_welcome(message).await {
                warn!(project_id = %project_id, error = %e, "Welcome message not sent");
            }
        }
    }
}
