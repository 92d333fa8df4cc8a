/// Maintenance scheduler
///
/// Runs one maintenance pass every poll interval until shut down:
///
/// ```text
/// MaintenanceScheduler
///   ├─> Planboard::scan_deadlines: remind participants of projects due soon
///   └─> Planboard::sweep_notifications: drop old read notifications
/// ```
///
/// A failing step is logged and retried on the next pass; it never stops
/// the loop.
///
/// # Example
///
/// ```no_run
/// use planboard_shared::services::Planboard;
/// use planboard_worker::config::ScheduleConfig;
/// use planboard_worker::scheduler::MaintenanceScheduler;
///
/// # async fn example(board: Planboard) {
/// let scheduler = MaintenanceScheduler::new(board, ScheduleConfig::default());
/// let shutdown = scheduler.shutdown_token();
///
/// tokio::spawn(async move { scheduler.run().await });
/// // ...
/// shutdown.cancel();
/// # }
/// ```

use crate::config::ScheduleConfig;
use chrono::{DateTime, Utc};
use planboard_shared::services::{DeadlineScan, Planboard};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// What one pass did; `None` means the step failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub deadlines: Option<DeadlineScan>,
    pub swept: Option<u64>,
}

pub struct MaintenanceScheduler {
    board: Planboard,
    config: ScheduleConfig,
    shutdown_token: CancellationToken,
}

impl MaintenanceScheduler {
    pub fn new(board: Planboard, config: ScheduleConfig) -> Self {
        MaintenanceScheduler {
            board,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Used to signal graceful shutdown from external handlers.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs passes until the shutdown token is cancelled
    ///
    /// The first pass starts immediately. Returns the number of passes run.
    pub async fn run(&self) -> u64 {
        tracing::info!(
            poll_interval_secs = self.config.poll_interval_secs,
            deadline_window_days = self.config.deadline_window_days,
            retention_days = self.config.retention_days,
            "Maintenance scheduler starting"
        );

        let mut passes = 0;
        loop {
            if self.shutdown_token.is_cancelled() {
                break;
            }

            self.run_pass(Utc::now()).await;
            passes += 1;

            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = sleep(self.config.poll_interval()) => {}
            }
        }

        tracing::info!(passes, "Maintenance scheduler shut down");
        passes
    }

    /// Runs both maintenance steps once, as of `now`
    pub async fn run_pass(&self, now: DateTime<Utc>) -> PassReport {
        let deadlines = match self
            .board
            .scan_deadlines(now, self.config.deadline_window_days)
            .await
        {
            Ok(scan) => Some(scan),
            Err(e) => {
                tracing::error!(error = %e, "Deadline scan failed");
                None
            }
        };

        let swept = match self
            .board
            .sweep_notifications(now, self.config.retention_days)
            .await
        {
            Ok(deleted) => Some(deleted),
            Err(e) => {
                tracing::error!(error = %e, "Notification sweep failed");
                None
            }
        };

        PassReport { deadlines, swept }
    }
}
