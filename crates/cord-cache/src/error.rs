//! Cache errors

use cord_core::Snowflake;

/// Error type for cache mutations that cannot be attributed to a known entity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Unknown server: {0}")]
    UnknownServer(Snowflake),

    #[error("Unknown channel: {0}")]
    UnknownChannel(Snowflake),

    #[error("Channel {0} cannot hold messages")]
    NotTextBearing(Snowflake),

    #[error("Cache can only be purged while hydrating")]
    PurgeWhileConnected,
}

pub type CacheResult<T> = Result<T, CacheError>;
