//! Gateway session settings

use std::time::Duration;

use cord_cache::MessageCacheConfig;
use cord_common::ClientConfig;

use super::HydrationConfig;

/// Settings of one gateway session
#[derive(Clone)]
pub struct GatewayConfig {
    pub token: String,
    /// REST base URL used to look up the gateway endpoint
    pub api_url: String,
    pub gateway_version: u8,
    pub shard: u32,
    pub total_shards: u32,
    /// Ask for zlib-compressed dispatches
    pub compress: bool,
    /// Servers above this member count are sent without offline members
    pub large_threshold: u32,
    pub reconnect: bool,
    /// Wait before identifying again after an invalid session
    pub invalid_session_delay: Duration,
    pub hydration: HydrationConfig,
    pub message_cache: MessageCacheConfig,
    pub message_sweep_interval: Duration,
}

impl GatewayConfig {
    /// Defaults for a single-shard bot
    pub fn new(token: impl Into<String>) -> Self {
        Self::from(&ClientConfig::new(token))
    }
}

impl From<&ClientConfig> for GatewayConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            token: config.token.clone(),
            api_url: config.api_url.clone(),
            gateway_version: config.gateway_version,
            shard: config.shard,
            total_shards: config.total_shards,
            compress: config.compress,
            large_threshold: config.large_threshold,
            reconnect: config.reconnect,
            invalid_session_delay: config.invalid_session_delay,
            hydration: HydrationConfig {
                poll_interval: config.hydration_poll_interval,
                stall_polls: config.hydration_stall_polls,
                chunk_quiet: config.hydration_chunk_quiet,
            },
            message_cache: MessageCacheConfig {
                capacity: config.message_cache_capacity,
                storage_time: config.message_cache_storage,
            },
            message_sweep_interval: config.message_sweep_interval,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("gateway_version", &self.gateway_version)
            .field("shard", &self.shard)
            .field("total_shards", &self.total_shards)
            .field("compress", &self.compress)
            .field("reconnect", &self.reconnect)
            .finish_non_exhaustive()
    }
}
