//! Server lifecycle: GUILD_CREATE, GUILD_UPDATE, GUILD_DELETE, GUILD_EMOJIS_UPDATE

use std::collections::HashSet;

use serde_json::Value;

use super::{builders, parse, HandlerContext, HandlerError, HandlerResult, PacketHandler};
use crate::events::{DispatchType, GuildEmojisUpdatePayload, GuildPayload, UnavailableGuild};
use crate::listener::{EntityKind, Event};
use crate::protocol::{GatewayMessage, RequestGuildMembersPayload};

fn is_unavailable_stub(data: &Value) -> bool {
    data.get("unavailable").and_then(Value::as_bool) == Some(true)
}

/// Caches a server and everything in it
pub struct GuildCreateHandler;

impl PacketHandler for GuildCreateHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::GuildCreate
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        if is_unavailable_stub(data) {
            return Ok(());
        }
        let payload: GuildPayload = parse(data)?;
        let was_unavailable = ctx.cache.is_server_unavailable(payload.id);
        if !was_unavailable && ctx.cache.server(payload.id).is_some() {
            tracing::debug!(server_id = %payload.id, "Server already cached");
            return Ok(());
        }

        let parts = builders::build_server(&ctx.cache, &payload)?;
        let needs_members = parts.server.needs_member_request();
        let server = ctx.cache.add_server(parts.server);
        for channel in parts.channels {
            ctx.cache.add_channel(channel)?;
        }
        for emoji in parts.emojis {
            ctx.cache.get_or_create_custom_emoji(emoji)?;
        }
        builders::apply_presences(&ctx.cache, &payload.presences);

        if needs_members {
            tracing::debug!(server_id = %payload.id, "Requesting remaining members");
            let request = GatewayMessage::request_guild_members(&RequestGuildMembersPayload::all(
                payload.id,
            ))?;
            ctx.sender.send(&request)?;
        }

        let scopes = [(EntityKind::Server, payload.id)];
        if was_unavailable {
            ctx.emit(Event::ServerBecomesAvailable { server }, &scopes);
        } else {
            tracing::info!(server_id = %payload.id, name = %payload.name, "Joined server");
            ctx.emit(Event::ServerJoin { server }, &scopes);
        }
        Ok(())
    }
}

pub struct GuildUpdateHandler;

impl PacketHandler for GuildUpdateHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::GuildUpdate
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: GuildPayload = parse(data)?;
        let server = ctx
            .cache
            .server(payload.id)
            .ok_or_else(|| HandlerError::unresolved("server", payload.id))?;

        let old_name = {
            let mut server = server.write();
            server.icon.clone_from(&payload.icon);
            server.region.clone_from(&payload.region);
            server.owner_id = payload.owner_id;
            if !payload.roles.is_empty() {
                server.roles = payload
                    .roles
                    .iter()
                    .map(|role| (role.id, builders::build_role(payload.id, role)))
                    .collect();
            }
            server.set_name(payload.name.clone())
        };

        if let Some(old_name) = old_name {
            ctx.emit(
                Event::ServerChangeName {
                    server,
                    old_name,
                    new_name: payload.name,
                },
                &[(EntityKind::Server, payload.id)],
            );
        }
        Ok(())
    }
}

/// Either the client left the server or the server went down
pub struct GuildDeleteHandler;

impl PacketHandler for GuildDeleteHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::GuildDelete
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: UnavailableGuild = parse(data)?;
        let scopes = [(EntityKind::Server, payload.id)];

        if payload.unavailable {
            tracing::warn!(server_id = %payload.id, "Server became unavailable");
            ctx.cache.mark_server_unavailable(payload.id);
            ctx.emit(
                Event::ServerBecomesUnavailable {
                    server_id: payload.id,
                },
                &scopes,
            );
        } else if let Some(server) = ctx.cache.remove_server(payload.id) {
            tracing::info!(server_id = %payload.id, "Left server");
            ctx.emit(Event::ServerLeave { server }, &scopes);
        }
        Ok(())
    }
}

/// Syncs a server's custom emojis with the full list sent
pub struct GuildEmojisUpdateHandler;

impl PacketHandler for GuildEmojisUpdateHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::GuildEmojisUpdate
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: GuildEmojisUpdatePayload = parse(data)?;
        let server = ctx
            .cache
            .server(payload.guild_id)
            .ok_or_else(|| HandlerError::unresolved("server", payload.guild_id))?;

        let emojis = payload
            .emojis
            .iter()
            .map(|emoji| builders::build_custom_emoji(payload.guild_id, emoji))
            .collect::<HandlerResult<Vec<_>>>()?;
        let current: HashSet<_> = emojis.iter().map(|emoji| emoji.id).collect();
        let known: Vec<_> = server.read().emoji_ids.iter().copied().collect();

        for id in known.into_iter().filter(|id| !current.contains(id)) {
            ctx.cache.remove_custom_emoji(id);
        }
        for emoji in emojis {
            if let Some(cached) = ctx.cache.custom_emoji(emoji.id) {
                let mut cached = cached.write();
                cached.name = emoji.name;
                cached.animated = emoji.animated;
                continue;
            }
            let id = emoji.id;
            let emoji = ctx.cache.get_or_create_custom_emoji(emoji)?;
            ctx.emit(
                Event::CustomEmojiCreate { emoji },
                &[(EntityKind::CustomEmoji, id), (EntityKind::Server, payload.guild_id)],
            );
        }
        Ok(())
    }
}
