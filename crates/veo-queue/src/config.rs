//! Engine configuration.

use std::time::Duration;

/// Poll cadence for long-running operations.
///
/// The timeout is a poll-count ceiling, not a wall-clock deadline.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Wait before each status poll
    pub poll_interval: Duration,
    /// Polls allowed before a job times out
    pub max_poll_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_poll_attempts: 30, // ~5 minutes
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_secs(
                std::env::var("VEO_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
            max_poll_attempts: std::env::var("VEO_POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Upper bound on time spent polling one job.
    pub fn poll_budget(&self) -> Duration {
        self.poll_interval * self.max_poll_attempts
    }
}
