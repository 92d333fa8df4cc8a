/// Maintenance pass tests over an in-memory store
///
/// These cover what the worker adds on top of the engine: one pass runs both
/// steps, a second pass the same day sends nothing new, and the sweep only
/// touches read notifications past retention.

use chrono::{Duration, Utc};
use planboard_shared::models::{CreateUser, NotificationType, User};
use planboard_shared::services::chat::LoggingChatNotifier;
use planboard_shared::services::effects::EffectMode;
use planboard_shared::services::{CollaboratorInput, CreateProject, Planboard};
use planboard_shared::store::{MemoryStore, Store};
use planboard_worker::config::ScheduleConfig;
use planboard_worker::scheduler::MaintenanceScheduler;
use std::sync::Arc;

struct Setup {
    store: Arc<MemoryStore>,
    board: Planboard,
    scheduler: MaintenanceScheduler,
}

fn setup() -> Setup {
    let store = Arc::new(MemoryStore::new());
    let board = Planboard::new(
        store.clone(),
        Arc::new(LoggingChatNotifier),
        EffectMode::Inline,
    );
    let scheduler = MaintenanceScheduler::new(board.clone(), ScheduleConfig::default());
    Setup {
        store,
        board,
        scheduler,
    }
}

async fn user(store: &MemoryStore, name: &str) -> User {
    store
        .create_user(CreateUser {
            email: format!("{}@example.com", name.to_lowercase()),
            name: name.to_string(),
            password_hash: String::new(),
        })
        .await
        .unwrap()
}

async fn deadline_reminders(store: &MemoryStore, user: &User) -> usize {
    store
        .list_notifications(user.id, false, 100)
        .await
        .unwrap()
        .iter()
        .filter(|n| n.notification_type == NotificationType::DeadlineApproaching)
        .count()
}

#[tokio::test]
async fn test_pass_reminds_each_participant_once_per_day() {
    let s = setup();
    let ada = user(&s.store, "Ada").await;
    let grace = user(&s.store, "Grace").await;
    let now = Utc::now();

    s.board
        .create_project(
            ada.id,
            CreateProject {
                due_date: Some(now + Duration::days(2)),
                collaborators: vec![CollaboratorInput {
                    user_id: grace.id,
                    role: None,
                }],
                ..CreateProject::named("Launch")
            },
        )
        .await
        .unwrap();

    // Outside the window
    s.board
        .create_project(
            ada.id,
            CreateProject {
                due_date: Some(now + Duration::days(10)),
                ..CreateProject::named("Later")
            },
        )
        .await
        .unwrap();

    let first = s.scheduler.run_pass(now).await;
    let scan = first.deadlines.unwrap();
    assert_eq!(scan.projects_due, 1);
    assert_eq!(scan.reminders_sent, 2);

    let second = s.scheduler.run_pass(now + Duration::minutes(5)).await;
    let scan = second.deadlines.unwrap();
    assert_eq!(scan.reminders_sent, 0);
    assert_eq!(scan.already_reminded, 2);

    assert_eq!(deadline_reminders(&s.store, &ada).await, 1);
    assert_eq!(deadline_reminders(&s.store, &grace).await, 1);
}

#[tokio::test]
async fn test_pass_sweeps_only_old_read_notifications() {
    let s = setup();
    let ada = user(&s.store, "Ada").await;
    let grace = user(&s.store, "Grace").await;

    for name in ["Launch", "Docs"] {
        s.board
            .create_project(
                ada.id,
                CreateProject {
                    collaborators: vec![CollaboratorInput {
                        user_id: grace.id,
                        role: None,
                    }],
                    ..CreateProject::named(name)
                },
            )
            .await
            .unwrap();
    }

    let invites = s.store.list_notifications(grace.id, false, 100).await.unwrap();
    assert_eq!(invites.len(), 2);
    s.board
        .mark_notification_read(grace.id, invites[0].id)
        .await
        .unwrap();

    // Nothing is past retention yet
    let report = s.scheduler.run_pass(Utc::now()).await;
    assert_eq!(report.swept, Some(0));

    // Forty days on, the read invite goes and the unread one stays
    let report = s.scheduler.run_pass(Utc::now() + Duration::days(40)).await;
    assert_eq!(report.swept, Some(1));

    let remaining = s.store.list_notifications(grace.id, false, 100).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(!remaining[0].is_read);
}
