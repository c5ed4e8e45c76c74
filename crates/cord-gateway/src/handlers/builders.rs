//! Turning wire payloads into cached entities
//!
//! Builders never write partial state: they either return a complete entity or
//! an error, and the calling handler writes to the cache afterwards.

use std::collections::HashSet;

use cord_cache::{Cached, EntityCache};
use cord_core::{
    Channel, ChannelCategory, ChannelType, CustomEmoji, Emoji, Game, GameType, GroupChannel,
    Member, Message, MessageAuthor, Overwrites, PermissionOverwrite, PrivateChannel, Role, Server,
    ServerTextChannel, ServerVoiceChannel, Snowflake, User, UserStatus,
};

use super::{HandlerError, HandlerResult};
use crate::events::{
    ChannelPayload, EmojiPayload, GuildPayload, MemberPayload, MessagePayload, PresencePayload,
    RolePayload, UserPayload,
};
use crate::protocol::ActivityPayload;

/// The cached user, created from the payload if unknown.
///
/// A full user object also refreshes the cached name and avatar.
pub fn get_or_create_user(cache: &EntityCache, payload: &UserPayload) -> HandlerResult<Cached<User>> {
    let user = cache.try_get_or_create_user(payload.id, || build_user(payload))?;
    if let Some(name) = &payload.username {
        let mut user = user.write();
        if user.name != *name {
            user.name.clone_from(name);
        }
        if let Some(discriminator) = &payload.discriminator {
            user.discriminator.clone_from(discriminator);
        }
        user.avatar.clone_from(&payload.avatar);
    }
    Ok(user)
}

fn build_user(payload: &UserPayload) -> HandlerResult<User> {
    let name = payload
        .username
        .clone()
        .ok_or(HandlerError::MissingField("user.username"))?;
    let mut user = User::new(
        payload.id,
        name,
        payload.discriminator.clone().unwrap_or_default(),
    );
    user.avatar.clone_from(&payload.avatar);
    user.bot = payload.bot;
    Ok(user)
}

pub fn build_role(server_id: Snowflake, payload: &RolePayload) -> Role {
    let mut role = Role::new(payload.id, server_id, payload.name.clone());
    role.color = payload.color;
    role.position = payload.position;
    role.permissions = payload.permissions;
    role
}

/// Build a member, caching its user
pub fn build_member(cache: &EntityCache, payload: &MemberPayload) -> HandlerResult<Member> {
    let user = get_or_create_user(cache, &payload.user)?;
    let mut member = Member::new(user.read().id);
    member.nickname.clone_from(&payload.nick);
    member.role_ids = payload.roles.iter().copied().collect();
    Ok(member)
}

/// Build a channel of any modelled kind.
///
/// `Ok(None)` for channel kinds this client does not model. Server channels take
/// their server from the payload, falling back to `server_id`.
pub fn build_channel(
    cache: &EntityCache,
    payload: &ChannelPayload,
    server_id: Option<Snowflake>,
) -> HandlerResult<Option<Channel>> {
    let Some(kind) = ChannelType::from_u8(payload.kind) else {
        tracing::debug!(channel_id = %payload.id, kind = payload.kind, "Skipping unsupported channel type");
        return Ok(None);
    };

    let server_id = || {
        payload
            .guild_id
            .or(server_id)
            .ok_or(HandlerError::MissingField("channel.guild_id"))
    };
    let name = || {
        payload
            .name
            .clone()
            .ok_or(HandlerError::MissingField("channel.name"))
    };
    let position = payload.position.unwrap_or_default();

    let channel = match kind {
        ChannelType::ServerText => Channel::ServerText(ServerTextChannel {
            id: payload.id,
            server_id: server_id()?,
            name: name()?,
            position,
            topic: payload.topic.clone().unwrap_or_default(),
            nsfw: payload.nsfw,
            parent_id: payload.parent_id,
            overwrites: build_overwrites(payload),
        }),
        ChannelType::ServerVoice => Channel::ServerVoice(ServerVoiceChannel {
            id: payload.id,
            server_id: server_id()?,
            name: name()?,
            position,
            bitrate: payload.bitrate.unwrap_or_default(),
            user_limit: payload.user_limit.unwrap_or_default(),
            parent_id: payload.parent_id,
            overwrites: build_overwrites(payload),
        }),
        ChannelType::Category => Channel::Category(ChannelCategory {
            id: payload.id,
            server_id: server_id()?,
            name: name()?,
            position,
            overwrites: build_overwrites(payload),
        }),
        ChannelType::Private => {
            let recipient = payload
                .recipients
                .first()
                .ok_or(HandlerError::MissingField("channel.recipients"))?;
            let recipient = get_or_create_user(cache, recipient)?;
            let recipient_id = recipient.read().id;
            Channel::Private(PrivateChannel {
                id: payload.id,
                recipient_id,
            })
        }
        ChannelType::Group => {
            let recipient_ids = payload
                .recipients
                .iter()
                .map(|recipient| {
                    let user = get_or_create_user(cache, recipient)?;
                    let id = user.read().id;
                    Ok(id)
                })
                .collect::<HandlerResult<HashSet<_>>>()?;
            Channel::Group(GroupChannel {
                id: payload.id,
                name: payload.name.clone(),
                icon: payload.icon.clone(),
                owner_id: payload.owner_id,
                recipient_ids,
            })
        }
    };
    Ok(Some(channel))
}

/// Permission overwrites of a channel; unknown target kinds are skipped
pub fn build_overwrites(payload: &ChannelPayload) -> Overwrites {
    let Some(overwrites) = &payload.permission_overwrites else {
        return Overwrites::new();
    };
    overwrites
        .iter()
        .filter_map(|overwrite| {
            let Some(target) = overwrite.target() else {
                tracing::debug!(channel_id = %payload.id, kind = ?overwrite.kind, "Skipping unknown overwrite kind");
                return None;
            };
            let permissions = PermissionOverwrite {
                allow: overwrite.allow,
                deny: overwrite.deny,
            };
            Some((target, permissions))
        })
        .collect()
}

pub fn build_custom_emoji(server_id: Snowflake, payload: &EmojiPayload) -> HandlerResult<CustomEmoji> {
    let id = payload.id.ok_or(HandlerError::MissingField("emoji.id"))?;
    let name = payload
        .name
        .clone()
        .ok_or(HandlerError::MissingField("emoji.name"))?;
    let mut emoji = CustomEmoji::new(id, server_id, name);
    emoji.animated = payload.animated;
    emoji.managed = payload.managed;
    emoji.require_colons = payload.require_colons;
    Ok(emoji)
}

/// Emoji reference of a reaction
pub fn build_emoji(payload: &EmojiPayload) -> HandlerResult<Emoji> {
    let name = payload.name.clone();
    match payload.id {
        Some(id) => Ok(Emoji::Custom {
            id,
            name: name.unwrap_or_default(),
            animated: payload.animated,
        }),
        None => name
            .map(Emoji::Unicode)
            .ok_or(HandlerError::MissingField("emoji.name")),
    }
}

pub fn build_game(payload: &ActivityPayload) -> Game {
    Game {
        name: payload.name.clone(),
        game_type: GameType::from_u8(payload.kind),
        streaming_url: payload.url.clone(),
    }
}

/// Build a message, caching its author unless a webhook posted it
pub fn build_message(cache: &EntityCache, payload: &MessagePayload) -> HandlerResult<Message> {
    let author = match payload.webhook_id {
        Some(_) => MessageAuthor::Webhook {
            id: payload.author.id,
            name: payload.author.username.clone().unwrap_or_default(),
            discriminator: payload.author.discriminator.clone().unwrap_or_default(),
            avatar: payload.author.avatar.clone(),
        },
        None => MessageAuthor::User(get_or_create_user(cache, &payload.author)?.read().id),
    };

    let mut message = Message::new(payload.id, payload.channel_id, author, payload.content.clone());
    if let Some(timestamp) = payload.timestamp {
        message.created_at = timestamp;
    }
    message.edited_at = payload.edited_timestamp;
    message.pinned = payload.pinned;
    message.tts = payload.tts;
    message.mentions_everyone = payload.mention_everyone;
    Ok(message)
}

/// A server assembled from GUILD_CREATE, with the entities stored beside it
pub struct ServerParts {
    pub server: Server,
    pub channels: Vec<Channel>,
    pub emojis: Vec<CustomEmoji>,
}

pub fn build_server(cache: &EntityCache, payload: &GuildPayload) -> HandlerResult<ServerParts> {
    let mut server = Server::new(payload.id, payload.name.clone(), payload.owner_id);
    server.icon.clone_from(&payload.icon);
    server.region.clone_from(&payload.region);
    server.large = payload.large;

    for role in &payload.roles {
        server.roles.insert(role.id, build_role(payload.id, role));
    }

    let mut channels = Vec::with_capacity(payload.channels.len());
    for channel in &payload.channels {
        if let Some(channel) = build_channel(cache, channel, Some(payload.id))? {
            channels.push(channel);
        }
    }
    let emojis = payload
        .emojis
        .iter()
        .map(|emoji| build_custom_emoji(payload.id, emoji))
        .collect::<HandlerResult<Vec<_>>>()?;

    // members cache their users, so nothing may fail past this point
    if let Some(member) = payload
        .members
        .iter()
        .find(|member| member.user.username.is_none() && cache.user(member.user.id).is_none())
    {
        tracing::debug!(user_id = %member.user.id, "Member without a resolvable user");
        return Err(HandlerError::MissingField("user.username"));
    }
    for member in &payload.members {
        server.add_member(build_member(cache, member)?);
    }
    server.member_count = payload
        .member_count
        .unwrap_or_else(|| u32::try_from(server.members.len()).unwrap_or(u32::MAX));

    Ok(ServerParts {
        server,
        channels,
        emojis,
    })
}

/// Apply presences sent along with a server, without emitting events
pub fn apply_presences(cache: &EntityCache, presences: &[PresencePayload]) {
    for presence in presences {
        let Some(user) = cache.user(presence.user.id) else {
            continue;
        };
        let mut user = user.write();
        if let Some(status) = &presence.status {
            user.set_status(UserStatus::from_wire(status));
        }
        user.set_game(presence.game.as_ref().map(build_game));
    }
}
