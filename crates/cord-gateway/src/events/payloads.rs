//! Dispatch payload definitions
//!
//! Wire shapes of the `d` field for each dispatch type. Fields this client does
//! not use are ignored; optional fields default so partial objects still parse.

use chrono::{DateTime, Utc};
use cord_core::{OverwriteTarget, Snowflake};
use serde::{Deserialize, Deserializer};

use crate::protocol::ActivityPayload;

/// Permissions arrive as a number or, on newer API versions, as a string
fn flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

const fn default_true() -> bool {
    true
}

// === Session ===

/// READY payload
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyPayload {
    #[serde(default)]
    pub v: u8,
    pub user: UserPayload,
    pub session_id: String,
    /// Every server of this shard, initially unavailable
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    #[serde(default)]
    pub private_channels: Vec<ChannelPayload>,
}

/// Server stub in READY and GUILD_DELETE
#[derive(Debug, Clone, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

// === Users ===

/// User object; only `id` is guaranteed on partial objects
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub id: Snowflake,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// PRESENCE_UPDATE payload, also embedded in GUILD_CREATE
#[derive(Debug, Clone, Deserialize)]
pub struct PresencePayload {
    pub user: UserPayload,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub game: Option<ActivityPayload>,
}

/// TYPING_START payload
#[derive(Debug, Clone, Deserialize)]
pub struct TypingStartPayload {
    pub channel_id: Snowflake,
    pub user_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

// === Servers ===

/// GUILD_CREATE / GUILD_UPDATE payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildPayload {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub owner_id: Snowflake,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub large: bool,
    #[serde(default)]
    pub member_count: Option<u32>,
    #[serde(default)]
    pub roles: Vec<RolePayload>,
    #[serde(default)]
    pub channels: Vec<ChannelPayload>,
    #[serde(default)]
    pub members: Vec<MemberPayload>,
    #[serde(default)]
    pub emojis: Vec<EmojiPayload>,
    #[serde(default)]
    pub presences: Vec<PresencePayload>,
}

/// Role object
#[derive(Debug, Clone, Deserialize)]
pub struct RolePayload {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub position: i32,
    #[serde(default, deserialize_with = "flexible_u64")]
    pub permissions: u64,
}

/// Emoji object; `id` is absent for unicode emojis
#[derive(Debug, Clone, Deserialize)]
pub struct EmojiPayload {
    #[serde(default)]
    pub id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub managed: bool,
    #[serde(default = "default_true")]
    pub require_colons: bool,
}

/// GUILD_EMOJIS_UPDATE payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildEmojisUpdatePayload {
    pub guild_id: Snowflake,
    pub emojis: Vec<EmojiPayload>,
}

// === Members ===

/// Member object
#[derive(Debug, Clone, Deserialize)]
pub struct MemberPayload {
    pub user: UserPayload,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

/// GUILD_MEMBER_ADD payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMemberAddPayload {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: MemberPayload,
}

/// GUILD_MEMBER_REMOVE payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMemberRemovePayload {
    pub guild_id: Snowflake,
    pub user: UserPayload,
}

/// GUILD_MEMBER_UPDATE payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMemberUpdatePayload {
    pub guild_id: Snowflake,
    pub user: UserPayload,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

/// GUILD_MEMBERS_CHUNK payload
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMembersChunkPayload {
    pub guild_id: Snowflake,
    pub members: Vec<MemberPayload>,
}

// === Channels ===

/// Channel object of any kind
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelPayload {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub nsfw: bool,
    #[serde(default)]
    pub parent_id: Option<Snowflake>,
    #[serde(default)]
    pub bitrate: Option<u32>,
    #[serde(default)]
    pub user_limit: Option<u32>,
    #[serde(default)]
    pub recipients: Vec<UserPayload>,
    #[serde(default)]
    pub owner_id: Option<Snowflake>,
    #[serde(default)]
    pub icon: Option<String>,
    /// Absent on partial updates, which leave the cached overwrites alone
    #[serde(default)]
    pub permission_overwrites: Option<Vec<OverwritePayload>>,
}

/// Overwrite target kind: `"role"`/`"member"`, or `0`/`1` on newer gateway versions
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OverwriteKind {
    Name(String),
    Code(u8),
}

/// Permission overwrite of a server channel
#[derive(Debug, Clone, Deserialize)]
pub struct OverwritePayload {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub kind: OverwriteKind,
    #[serde(default, deserialize_with = "flexible_u64")]
    pub allow: u64,
    #[serde(default, deserialize_with = "flexible_u64")]
    pub deny: u64,
}

impl OverwritePayload {
    /// `None` for target kinds this client does not know
    #[must_use]
    pub fn target(&self) -> Option<OverwriteTarget> {
        match &self.kind {
            OverwriteKind::Code(0) => Some(OverwriteTarget::Role(self.id)),
            OverwriteKind::Code(1) => Some(OverwriteTarget::Member(self.id)),
            OverwriteKind::Name(kind) => match kind.as_str() {
                "role" => Some(OverwriteTarget::Role(self.id)),
                "member" => Some(OverwriteTarget::Member(self.id)),
                _ => None,
            },
            OverwriteKind::Code(_) => None,
        }
    }
}

// === Messages ===

/// MESSAGE_CREATE payload
#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub author: UserPayload,
    /// Present when a webhook posted the message
    #[serde(default)]
    pub webhook_id: Option<Snowflake>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub mention_everyone: bool,
}

/// MESSAGE_UPDATE payload; every field but the IDs may be missing
#[derive(Debug, Clone, Deserialize)]
pub struct MessageUpdatePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub edited_timestamp: Option<DateTime<Utc>>,
}

/// MESSAGE_DELETE payload
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeletePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
}

/// MESSAGE_DELETE_BULK payload
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeleteBulkPayload {
    pub ids: Vec<Snowflake>,
    pub channel_id: Snowflake,
}

/// MESSAGE_REACTION_ADD / MESSAGE_REACTION_REMOVE payload
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionPayload {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    pub emoji: EmojiPayload,
}
