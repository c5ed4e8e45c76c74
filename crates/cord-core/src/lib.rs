//! # cord-core
//!
//! Domain layer containing the entities mirrored from the remote service and
//! their identifiers. This crate performs no I/O.

pub mod entities;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Channel, ChannelCategory, ChannelType, CustomEmoji, Emoji, Game, GameType, GroupChannel,
    Member, Message, MessageAuthor, OverwriteChange, OverwriteTarget, Overwrites,
    PermissionOverwrite, PrivateChannel, Reaction, Role, Server, ServerTextChannel,
    ServerVoiceChannel, User, UserStatus,
};
pub use value_objects::{Snowflake, SnowflakeParseError};
