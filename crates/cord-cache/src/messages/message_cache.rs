//! Bounded message buffer for a single channel
//!
//! A message is kept while it is among the newest `capacity` entries and
//! younger than `storage_time`. Eviction happens only in [`MessageCache::sweep`].

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use cord_core::Snowflake;

/// Message retention settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCacheConfig {
    /// Maximum number of messages kept per channel
    pub capacity: usize,
    /// Maximum age of a cached message
    pub storage_time: Duration,
}

impl Default for MessageCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            storage_time: Duration::from_secs(12 * 60 * 60),
        }
    }
}

/// Insertion-ordered message IDs of one channel, oldest first
#[derive(Debug, Clone)]
pub struct MessageCache {
    config: MessageCacheConfig,
    entries: VecDeque<(Snowflake, Instant)>,
    /// Same IDs as `entries`, for constant-time membership
    present: HashSet<Snowflake>,
}

impl MessageCache {
    #[must_use]
    pub fn new(config: MessageCacheConfig) -> Self {
        Self {
            config,
            entries: VecDeque::new(),
            present: HashSet::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> MessageCacheConfig {
        self.config
    }

    /// Replace the retention settings; takes effect on the next sweep
    pub fn set_config(&mut self, config: MessageCacheConfig) {
        self.config = config;
    }

    /// Record a message as cached at `now`. Re-inserting an ID is a no-op.
    pub fn push(&mut self, message_id: Snowflake, now: Instant) {
        if self.present.insert(message_id) {
            self.entries.push_back((message_id, now));
        }
    }

    pub fn remove(&mut self, message_id: Snowflake) -> bool {
        if !self.present.remove(&message_id) {
            return false;
        }
        self.entries.retain(|(id, _)| *id != message_id);
        true
    }

    #[must_use]
    pub fn contains(&self, message_id: Snowflake) -> bool {
        self.present.contains(&message_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached message IDs, oldest first
    #[must_use]
    pub fn ids(&self) -> Vec<Snowflake> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    /// Drop everything over capacity or past its storage time, returning the evicted IDs
    pub fn sweep(&mut self, now: Instant) -> Vec<Snowflake> {
        let keep_from = self.entries.len().saturating_sub(self.config.capacity);
        let storage_time = self.config.storage_time;

        let mut evicted = Vec::new();
        let mut index = 0;
        self.entries.retain(|(id, inserted)| {
            let within_capacity = index >= keep_from;
            let fresh = now.saturating_duration_since(*inserted) < storage_time;
            index += 1;
            if within_capacity && fresh {
                true
            } else {
                evicted.push(*id);
                false
            }
        });
        for id in &evicted {
            self.present.remove(id);
        }
        evicted
    }
}
