use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{info, instrument};

use super::service::TokenService;

/// Configuration for the blacklist cleanup task
#[derive(Debug, Clone)]
pub struct BlacklistCleanupConfig {
    /// How often expired blacklist entries are dropped
    pub cleanup_interval: Duration,
}

impl Default for BlacklistCleanupConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Starts the background task that periodically purges expired revocations
#[instrument(skip(token_service))]
pub async fn start_blacklist_cleanup_task(
    token_service: Arc<TokenService>,
    config: BlacklistCleanupConfig,
) {
    info!(
        cleanup_interval_secs = config.cleanup_interval.as_secs(),
        "Starting token blacklist cleanup background task"
    );

    let mut cleanup_interval = interval(config.cleanup_interval);

    loop {
        cleanup_interval.tick().await;
        token_service.purge_expired().await;
    }
}
