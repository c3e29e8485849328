//! Background retention cleanup task for read notifications.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use crate::usecase::NotificationUseCase;

/// Spawn a background task that periodically purges read notifications past retention.
///
/// Runs every `interval_secs` seconds and logs the number of purged rows each cycle.
pub fn spawn_retention_cleanup(
    notification_usecase: Arc<NotificationUseCase>,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            match notification_usecase.cleanup_expired().await {
                Ok(count) if count > 0 => {
                    tracing::info!("Notification retention cleanup: purged {} notifications", count);
                }
                Ok(_) => {
                    tracing::debug!("Notification retention cleanup: nothing to purge");
                }
                Err(e) => {
                    tracing::error!("Notification retention cleanup error: {}", e);
                }
            }
        }
    })
}
