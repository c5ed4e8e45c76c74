//! Control payload definitions
//!
//! The `d` field of every non-dispatch packet either side sends.

use cord_core::{Game, Snowflake};
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub properties: IdentifyProperties,
    /// Allow the server to send zlib-compressed frames
    pub compress: bool,
    /// Member count above which a server's members are sent lazily
    pub large_threshold: u32,
    /// `[shard index, total shards]`, only present when sharding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
}

impl IdentifyPayload {
    /// Build the payload; the shard pair is only included when `total_shards > 1`
    pub fn new(
        token: impl Into<String>,
        compress: bool,
        large_threshold: u32,
        shard: u32,
        total_shards: u32,
    ) -> Self {
        Self {
            token: token.into(),
            properties: IdentifyProperties::default(),
            compress,
            large_threshold,
            shard: (total_shards > 1).then_some([shard, total_shards]),
        }
    }
}

/// Client connection properties
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyProperties {
    #[serde(rename = "$os")]
    pub os: String,
    #[serde(rename = "$browser")]
    pub browser: String,
    #[serde(rename = "$device")]
    pub device: String,
    #[serde(rename = "$referrer")]
    pub referrer: String,
    #[serde(rename = "$referring_domain")]
    pub referring_domain: String,
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: env!("CARGO_PKG_NAME").to_string(),
            device: env!("CARGO_PKG_NAME").to_string(),
            referrer: String::new(),
            referring_domain: String::new(),
        }
    }
}

/// Payload for op 6 (Resume)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    /// Session ID to resume
    pub session_id: String,
    /// Last received sequence number
    pub seq: Option<u64>,
}

/// Payload for op 3 (Status Update)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdatePayload {
    /// Unix time in milliseconds of when the client went idle
    pub since: Option<u64>,
    pub game: Option<ActivityPayload>,
    pub status: String,
    pub afk: bool,
}

impl StatusUpdatePayload {
    /// An online status showing `game`
    #[must_use]
    pub fn online(game: Option<&Game>) -> Self {
        Self {
            since: None,
            game: game.map(ActivityPayload::from),
            status: "online".to_string(),
            afk: false,
        }
    }
}

/// Activity ("game") object used by status updates and presences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPayload {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<&Game> for ActivityPayload {
    fn from(game: &Game) -> Self {
        Self {
            name: game.name.clone(),
            kind: game.game_type.as_u8(),
            url: game.streaming_url.clone(),
        }
    }
}

/// Payload for op 8 (Request Guild Members)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestGuildMembersPayload {
    pub guild_id: Snowflake,
    /// Username prefix filter, empty for everyone
    pub query: String,
    /// Maximum members to send, 0 for everyone
    pub limit: u32,
}

impl RequestGuildMembersPayload {
    /// Request every member of a server
    #[must_use]
    pub fn all(guild_id: Snowflake) -> Self {
        Self {
            guild_id,
            query: String::new(),
            limit: 0,
        }
    }
}
