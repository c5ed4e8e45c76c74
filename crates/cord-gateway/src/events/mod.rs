//! Gateway events
//!
//! Dispatch packet types and the payload shapes they carry.

mod event_types;
mod payloads;

pub use event_types::DispatchType;
pub use payloads::{
    ChannelPayload, EmojiPayload, GuildEmojisUpdatePayload, GuildMemberAddPayload,
    GuildMemberRemovePayload, GuildMemberUpdatePayload, GuildMembersChunkPayload, GuildPayload,
    MemberPayload, MessageDeleteBulkPayload, MessageDeletePayload, MessagePayload,
    MessageUpdatePayload, OverwriteKind, OverwritePayload, PresencePayload, ReactionPayload,
    ReadyPayload, RolePayload, TypingStartPayload, UnavailableGuild, UserPayload,
};
