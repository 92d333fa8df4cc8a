/// Periodic maintenance run by the worker
///
/// The deadline scan reminds every participant of a project that is due
/// soon, at most once per recipient, project and calendar day (UTC). The
/// retention sweep drops read notifications past the retention period.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::fanout::{DomainEvent, ProjectRef};
use super::Planboard;
use crate::error::CoreResult;
use crate::models::{NotificationType, Project};

/// Outcome of one deadline scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeadlineScan {
    pub projects_due: usize,
    pub reminders_sent: usize,
    pub already_reminded: usize,
}

/// Whole days until `due`, rounded up, never negative
pub fn days_left(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    const DAY: i64 = 86_400;
    let seconds = (due - now).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    (seconds + DAY - 1) / DAY
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

impl Planboard {
    /// Sends deadline reminders for projects due within `window_days` of `now`
    pub async fn scan_deadlines(&self, now: DateTime<Utc>, window_days: i64) -> CoreResult<DeadlineScan> {
        let due = self
            .store
            .list_projects_due_between(now, now + Duration::days(window_days))
            .await?;

        let mut scan = DeadlineScan {
            projects_due: due.len(),
            ..Default::default()
        };

        for project in &due {
            let Some(due_date) = project.due_date else {
                continue;
            };

            let (recipients, skipped) = self.unreminded(project, start_of_day(now)).await;
            scan.already_reminded += skipped;
            if recipients.is_empty() {
                continue;
            }

            let event = DomainEvent::DeadlineApproaching {
                project: ProjectRef::from(project),
                recipients,
                days_left: days_left(due_date, now),
            };
            scan.reminders_sent += self.effects.fanout().notify(None, &event).await.len();
        }

        info!(
            projects_due = scan.projects_due,
            reminders_sent = scan.reminders_sent,
            already_reminded = scan.already_reminded,
            "Deadline scan finished"
        );
        Ok(scan)
    }

    /// Participants without a reminder for this project since `since`
    async fn unreminded(&self, project: &Project, since: DateTime<Utc>) -> (Vec<uuid::Uuid>, usize) {
        let mut pending = Vec::new();
        let mut skipped = 0;

        for recipient in project.participants() {
            match self
                .store
                .notification_exists_since(
                    recipient,
                    NotificationType::DeadlineApproaching,
                    project.id,
                    since,
                )
                .await
            {
                Ok(true) => skipped += 1,
                Ok(false) => pending.push(recipient),
                Err(e) => {
                    warn!(
                        project_id = %project.id,
                        recipient_id = %recipient,
                        error = %e,
                        "Reminder lookup failed, skipping recipient"
                    );
                }
            }
        }

        (pending, skipped)
    }

    /// Deletes read notifications older than `retention_days`
    pub async fn sweep_notifications(&self, now: DateTime<Utc>, retention_days: i64) -> CoreResult<u64> {
        let cutoff = now - Duration::days(retention_days);
        let deleted = self.store.delete_read_notifications_before(cutoff).await?;
        info!(deleted, cutoff = %cutoff, "Notification sweep finished");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, ProjectPatch, ProjectStatus};
    use crate::services::testing::Harness;
    use crate::services::CreateProject;

    #[test]
    fn test_days_left_rounds_up() {
        let now = Utc::now();
        assert_eq!(days_left(now + Duration::hours(3), now), 1);
        assert_eq!(days_left(now + Duration::days(2), now), 2);
        assert_eq!(days_left(now + Duration::days(2) + Duration::minutes(1), now), 3);
        assert_eq!(days_left(now - Duration::hours(1), now), 0);
    }

    async fn due_project(h: &Harness, owner: &crate::models::User, due_in: Duration) -> Project {
        let mut input = CreateProject::named("Launch");
        input.due_date = Some(Utc::now() + due_in);
        h.board.create_project(owner.id, input).await.unwrap()
    }

    #[tokio::test]
    async fn test_reminds_owner_and_collaborators_once_per_day() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let grace = h.user("Grace").await;
        let project = due_project(&h, &ada, Duration::hours(20)).await;
        h.board
            .add_collaborator(ada.id, project.id, grace.id, None)
            .await
            .unwrap();
        let now = Utc::now();

        let first = h.board.scan_deadlines(now, 3).await.unwrap();
        assert_eq!(first.projects_due, 1);
        assert_eq!(first.reminders_sent, 2);

        let reminder = &h.inbox(&ada).await[0];
        assert_eq!(reminder.notification_type, NotificationType::DeadlineApproaching);
        assert_eq!(reminder.priority, Priority::High);
        assert_eq!(reminder.message, "Project \"Launch\" is due tomorrow");
        assert_eq!(reminder.action_by, None);

        let second = h.board.scan_deadlines(now, 3).await.unwrap();
        assert_eq!(second.reminders_sent, 0);
        assert_eq!(second.already_reminded, 2);
    }

    #[tokio::test]
    async fn test_skips_completed_and_distant_projects() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        due_project(&h, &ada, Duration::days(10)).await;
        let done = due_project(&h, &ada, Duration::days(1)).await;
        h.board
            .update_project(
                ada.id,
                done.id,
                ProjectPatch {
                    status: Some(ProjectStatus::Completed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let scan = h.board.scan_deadlines(Utc::now(), 3).await.unwrap();
        assert_eq!(scan, DeadlineScan::default());
    }

    #[tokio::test]
    async fn test_sweep_removes_only_old_read_notifications() {
        let h = Harness::new();
        let ada = h.user("Ada").await;
        let grace = h.user("Grace").await;
        for name in ["Launch", "Docs"] {
            let project = h.project(&ada, name).await;
            h.board
                .add_collaborator(ada.id, project.id, grace.id, None)
                .await
                .unwrap();
        }
        let inbox = h.inbox(&grace).await;
        h.board.mark_notification_read(grace.id, inbox[0].id).await.unwrap();

        // Nothing is older than the retention period yet
        assert_eq!(h.board.sweep_notifications(Utc::now(), 30).await.unwrap(), 0);

        let later = Utc::now() + Duration::days(31);
        assert_eq!(h.board.sweep_notifications(later, 30).await.unwrap(), 1);
        assert_eq!(h.inbox(&grace).await.len(), 1);
    }
}
