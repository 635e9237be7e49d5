//! Worker configuration loaded from environment variables.

use std::time::Duration;

use stockroom_core::reconciliation::ReconcileWindows;

/// Configuration for the reconciler worker.
///
/// All tunables have defaults suitable for local development; the two
/// connection URLs are required.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Postgres connection URL.
    pub database_url: String,
    /// Redis connection URL.
    pub redis_url: String,
    /// How often a reconciliation pass runs.
    pub interval: Duration,
    /// Deadline windows for expired-hold selection.
    pub windows: ReconcileWindows,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                           | Default      |
    /// |-----------------------------------|--------------|
    /// | `DATABASE_URL`                    | *(required)* |
    /// | `REDIS_URL`                       | *(required)* |
    /// | `RECONCILE_INTERVAL_SECS`         | `60`         |
    /// | `RECONCILE_SHORT_WINDOW_MINUTES`  | `30`         |
    /// | `RECONCILE_MEDIUM_WINDOW_MINUTES` | `1440`       |
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let redis_url = std::env::var("REDIS_URL").expect("REDIS_URL must be set");

        let interval_secs: u64 = std::env::var("RECONCILE_INTERVAL_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("RECONCILE_INTERVAL_SECS must be a valid u64");

        let short_minutes: i64 = std::env::var("RECONCILE_SHORT_WINDOW_MINUTES")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("RECONCILE_SHORT_WINDOW_MINUTES must be a valid i64");

        let medium_minutes: i64 = std::env::var("RECONCILE_MEDIUM_WINDOW_MINUTES")
            .unwrap_or_else(|_| "1440".into())
            .parse()
            .expect("RECONCILE_MEDIUM_WINDOW_MINUTES must be a valid i64");

        Self {
            database_url,
            redis_url,
            interval: Duration::from_secs(interval_secs),
            windows: ReconcileWindows::from_minutes(short_minutes, medium_minutes),
        }
    }
}
