//! Background task running the message sweep on a fixed schedule

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::store::EntityCache;

/// Spawn the periodic message sweep. The first sweep runs one `period` after spawning.
///
/// The returned handle is the only way to stop the task; the owner aborts it on shutdown.
pub fn spawn_message_sweeper(cache: Arc<EntityCache>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let evicted = cache.sweep_messages();
            if evicted > 0 {
                tracing::debug!(evicted, "Swept cached messages");
            }
        }
    })
}
