//! Domain entities - the remote state mirrored by the cache

mod channel;
mod emoji;
mod member;
mod message;
mod reaction;
mod role;
mod server;
mod user;

pub use channel::{
    Channel, ChannelCategory, ChannelType, GroupChannel, OverwriteChange, OverwriteTarget,
    Overwrites, PermissionOverwrite, PrivateChannel, ServerTextChannel, ServerVoiceChannel,
};
pub use emoji::{CustomEmoji, Emoji};
pub use member::Member;
pub use message::{Message, MessageAuthor};
pub use reaction::Reaction;
pub use role::Role;
pub use server::Server;
pub use user::{Game, GameType, User, UserStatus};
