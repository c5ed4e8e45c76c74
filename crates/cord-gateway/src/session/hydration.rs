//! Waiting for the cache to fill after READY
//!
//! After READY every server arrives in its own GUILD_CREATE and large servers
//! send their members in chunks. The session polls the cache until everything
//! has loaded, or gives up once nothing has changed for a while.

use std::time::Duration;

use cord_cache::EntityCache;

/// Hydration polling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydrationConfig {
    pub poll_interval: Duration,
    /// Polls without progress before giving up
    pub stall_polls: u32,
    /// Member chunks keep the wait alive until this long after the last one
    pub chunk_quiet: Duration,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            stall_polls: 20,
            chunk_quiet: Duration::from_secs(5),
        }
    }
}

/// How the wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationOutcome {
    /// Every server and every member loaded
    Complete,
    /// Gave up waiting; some servers or members are missing
    Stalled,
}

/// Poll the cache until hydration completes or stalls
pub async fn wait_for_hydration(cache: &EntityCache, config: &HydrationConfig) -> HydrationOutcome {
    let mut last_unavailable = cache.unavailable_server_count();
    let mut unchanged_polls = 0u32;

    loop {
        if cache.all_servers_loaded() {
            return HydrationOutcome::Complete;
        }

        let unavailable = cache.unavailable_server_count();
        if unavailable == last_unavailable {
            unchanged_polls = unchanged_polls.saturating_add(1);
        } else {
            unchanged_polls = 0;
            last_unavailable = unavailable;
        }

        let chunks_quiet = !matches!(
            cache.last_member_chunk(),
            Some(at) if at.elapsed() < config.chunk_quiet
        );
        if unchanged_polls >= config.stall_polls && chunks_quiet {
            tracing::warn!(
                unavailable,
                polls = unchanged_polls,
                "Hydration stalled, continuing without the remaining servers"
            );
            return HydrationOutcome::Stalled;
        }

        tokio::time::sleep(config.poll_interval).await;
    }
}
