//! Application events
//!
//! Every event is derived from a packet the gateway delivered; the client never
//! authors events of its own.

use std::fmt;

use cord_cache::Cached;
use cord_core::{
    Channel, CustomEmoji, Emoji, Game, Message, OverwriteTarget, PermissionOverwrite, Server,
    Snowflake, User, UserStatus,
};

/// Kind of an [`Event`], used as the registration key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MessageCreate,
    MessageEdit,
    MessageDelete,
    ReactionAdd,
    ReactionRemove,
    ServerJoin,
    ServerLeave,
    ServerBecomesAvailable,
    ServerBecomesUnavailable,
    ServerChangeName,
    ServerMemberAdd,
    ServerMemberRemove,
    UserChangeNickname,
    UserRoleAdd,
    UserRoleRemove,
    ServerChannelCreate,
    ServerChannelDelete,
    ServerChannelChangeName,
    ServerChannelChangePosition,
    ServerChannelChangeOverwrittenPermissions,
    ServerTextChannelChangeTopic,
    CustomEmojiCreate,
    UserChangeStatus,
    UserChangeGame,
    UserStartTyping,
    LostConnection,
    Ready,
    Resume,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Kind of entity a scoped listener watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Server,
    Channel,
    Message,
    Role,
    CustomEmoji,
}

/// A watched entity: its kind and ID
pub type Scope = (EntityKind, Snowflake);

/// Something that happened on the gateway
#[derive(Debug, Clone)]
pub enum Event {
    MessageCreate {
        message: Cached<Message>,
    },
    MessageEdit {
        message_id: Snowflake,
        channel_id: Snowflake,
        /// The cached message, if it was still cached
        message: Option<Cached<Message>>,
        old_content: Option<String>,
        new_content: String,
    },
    MessageDelete {
        message_id: Snowflake,
        channel_id: Snowflake,
        message: Option<Cached<Message>>,
    },
    ReactionAdd {
        message_id: Snowflake,
        channel_id: Snowflake,
        user_id: Snowflake,
        emoji: Emoji,
    },
    ReactionRemove {
        message_id: Snowflake,
        channel_id: Snowflake,
        user_id: Snowflake,
        emoji: Emoji,
    },
    ServerJoin {
        server: Cached<Server>,
    },
    ServerLeave {
        server: Cached<Server>,
    },
    ServerBecomesAvailable {
        server: Cached<Server>,
    },
    ServerBecomesUnavailable {
        server_id: Snowflake,
    },
    ServerChangeName {
        server: Cached<Server>,
        old_name: String,
        new_name: String,
    },
    ServerMemberAdd {
        server: Cached<Server>,
        user: Cached<User>,
    },
    ServerMemberRemove {
        server: Cached<Server>,
        user: Cached<User>,
    },
    UserChangeNickname {
        server: Cached<Server>,
        user: Cached<User>,
        old_nickname: Option<String>,
        new_nickname: Option<String>,
    },
    UserRoleAdd {
        server: Cached<Server>,
        user: Cached<User>,
        role_id: Snowflake,
    },
    UserRoleRemove {
        server: Cached<Server>,
        user: Cached<User>,
        role_id: Snowflake,
    },
    ServerChannelCreate {
        channel: Cached<Channel>,
    },
    ServerChannelDelete {
        channel: Cached<Channel>,
    },
    ServerChannelChangeName {
        channel: Cached<Channel>,
        old_name: String,
        new_name: String,
    },
    ServerChannelChangePosition {
        channel: Cached<Channel>,
        old_position: i32,
        new_position: i32,
    },
    /// An overwrite was added (`old` is `None`), changed, or dropped (`new` is `None`)
    ServerChannelChangeOverwrittenPermissions {
        channel: Cached<Channel>,
        target: OverwriteTarget,
        old_permissions: Option<PermissionOverwrite>,
        new_permissions: Option<PermissionOverwrite>,
    },
    ServerTextChannelChangeTopic {
        channel: Cached<Channel>,
        old_topic: String,
        new_topic: String,
    },
    CustomEmojiCreate {
        emoji: Cached<CustomEmoji>,
    },
    UserChangeStatus {
        user: Cached<User>,
        old_status: UserStatus,
        new_status: UserStatus,
    },
    UserChangeGame {
        user: Cached<User>,
        old_game: Option<Game>,
        new_game: Option<Game>,
    },
    UserStartTyping {
        channel_id: Snowflake,
        user_id: Snowflake,
    },
    /// The transport dropped
    LostConnection,
    /// A fresh session finished hydrating
    Ready,
    /// A dropped session was resumed
    Resume,
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MessageCreate { .. } => EventKind::MessageCreate,
            Self::MessageEdit { .. } => EventKind::MessageEdit,
            Self::MessageDelete { .. } => EventKind::MessageDelete,
            Self::ReactionAdd { .. } => EventKind::ReactionAdd,
            Self::ReactionRemove { .. } => EventKind::ReactionRemove,
            Self::ServerJoin { .. } => EventKind::ServerJoin,
            Self::ServerLeave { .. } => EventKind::ServerLeave,
            Self::ServerBecomesAvailable { .. } => EventKind::ServerBecomesAvailable,
            Self::ServerBecomesUnavailable { .. } => EventKind::ServerBecomesUnavailable,
            Self::ServerChangeName { .. } => EventKind::ServerChangeName,
            Self::ServerMemberAdd { .. } => EventKind::ServerMemberAdd,
            Self::ServerMemberRemove { .. } => EventKind::ServerMemberRemove,
            Self::UserChangeNickname { .. } => EventKind::UserChangeNickname,
            Self::UserRoleAdd { .. } => EventKind::UserRoleAdd,
            Self::UserRoleRemove { .. } => EventKind::UserRoleRemove,
            Self::ServerChannelCreate { .. } => EventKind::ServerChannelCreate,
            Self::ServerChannelDelete { .. } => EventKind::ServerChannelDelete,
            Self::ServerChannelChangeName { .. } => EventKind::ServerChannelChangeName,
            Self::ServerChannelChangePosition { .. } => EventKind::ServerChannelChangePosition,
            Self::ServerChannelChangeOverwrittenPermissions { .. } => {
                EventKind::ServerChannelChangeOverwrittenPermissions
            }
            Self::ServerTextChannelChangeTopic { .. } => EventKind::ServerTextChannelChangeTopic,
            Self::CustomEmojiCreate { .. } => EventKind::CustomEmojiCreate,
            Self::UserChangeStatus { .. } => EventKind::UserChangeStatus,
            Self::UserChangeGame { .. } => EventKind::UserChangeGame,
            Self::UserStartTyping { .. } => EventKind::UserStartTyping,
            Self::LostConnection => EventKind::LostConnection,
            Self::Ready => EventKind::Ready,
            Self::Resume => EventKind::Resume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        assert_eq!(Event::Ready.kind(), EventKind::Ready);
        assert_eq!(
            Event::UserStartTyping {
                channel_id: Snowflake::new(1),
                user_id: Snowflake::new(2),
            }
            .kind(),
            EventKind::UserStartTyping
        );
    }

    #[test]
    fn test_event_kind_display() {
        assert_eq!(EventKind::ServerChangeName.to_string(), "ServerChangeName");
    }
}
