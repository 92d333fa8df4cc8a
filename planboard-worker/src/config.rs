/// Worker configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 5)
/// - `WORKER_POLL_INTERVAL_SECS`: Seconds between maintenance passes (default: 300)
/// - `DEADLINE_WINDOW_DAYS`: How far ahead the deadline scan looks (default: 3)
/// - `NOTIFICATION_RETENTION_DAYS`: Age at which read notifications are swept (default: 30)

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Complete worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub schedule: ScheduleConfig,
}

/// What each maintenance pass does and how often it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub poll_interval_secs: u64,
    pub deadline_window_days: i64,
    pub retention_days: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            poll_interval_secs: 300,
            deadline_window_days: 3,
            retention_days: 30,
        }
    }
}

impl ScheduleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_secs == 0 {
            anyhow::bail!("WORKER_POLL_INTERVAL_SECS must be greater than zero");
        }
        if self.deadline_window_days < 0 {
            anyhow::bail!("DEADLINE_WINDOW_DAYS must not be negative");
        }
        if self.retention_days < 1 {
            anyhow::bail!("NOTIFICATION_RETENTION_DAYS must be at least 1");
        }
        Ok(())
    }
}

fn var_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

impl WorkerConfig {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a variable has an
    /// invalid value.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let defaults = ScheduleConfig::default();

        let schedule = ScheduleConfig {
            poll_interval_secs: var_or("WORKER_POLL_INTERVAL_SECS", defaults.poll_interval_secs)?,
            deadline_window_days: var_or("DEADLINE_WINDOW_DAYS", defaults.deadline_window_days)?,
            retention_days: var_or("NOTIFICATION_RETENTION_DAYS", defaults.retention_days)?,
        };
        schedule.validate()?;

        Ok(WorkerConfig {
            database_url,
            max_connections: var_or("DATABASE_MAX_CONNECTIONS", 5)?,
            schedule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_defaults() {
        let schedule = ScheduleConfig::default();
        assert_eq!(schedule.poll_interval(), Duration::from_secs(300));
        assert_eq!(schedule.deadline_window_days, 3);
        assert_eq!(schedule.retention_days, 30);
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn test_schedule_rejects_zero_interval() {
        let schedule = ScheduleConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn test_schedule_rejects_zero_retention() {
        let schedule = ScheduleConfig {
            retention_days: 0,
            ..Default::default()
        };
        assert!(schedule.validate().is_err());
    }
}
