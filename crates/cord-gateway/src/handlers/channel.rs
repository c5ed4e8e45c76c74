//! Channel lifecycle: CHANNEL_CREATE, CHANNEL_UPDATE, CHANNEL_DELETE

use cord_core::{Channel, OverwriteTarget, Snowflake};
use serde_json::Value;

use super::{builders, parse, HandlerContext, HandlerError, HandlerResult, PacketHandler};
use crate::events::{ChannelPayload, DispatchType};
use crate::listener::{EntityKind, Event, Scope};

fn channel_scopes(channel_id: Snowflake, server_id: Snowflake) -> [Scope; 2] {
    [
        (EntityKind::Channel, channel_id),
        (EntityKind::Server, server_id),
    ]
}

pub struct ChannelCreateHandler;

impl PacketHandler for ChannelCreateHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::ChannelCreate
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: ChannelPayload = parse(data)?;
        if ctx.cache.channel(payload.id).is_some() {
            return Ok(());
        }
        let Some(channel) = builders::build_channel(&ctx.cache, &payload, None)? else {
            return Ok(());
        };

        let server_id = channel.server_id();
        let channel = ctx.cache.add_channel(channel)?;
        if let Some(server_id) = server_id {
            ctx.emit(
                Event::ServerChannelCreate { channel },
                &channel_scopes(payload.id, server_id),
            );
        }
        Ok(())
    }
}

/// Name, position, topic and permission overwrite changes
pub struct ChannelUpdateHandler;

impl PacketHandler for ChannelUpdateHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::ChannelUpdate
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: ChannelPayload = parse(data)?;
        let channel = ctx
            .cache
            .channel(payload.id)
            .ok_or_else(|| HandlerError::unresolved("channel", payload.id))?;

        let mut guard = channel.write();
        let Some(server_id) = guard.server_id() else {
            if let Channel::Group(group) = &mut *guard {
                group.name.clone_from(&payload.name);
                group.icon.clone_from(&payload.icon);
                group.owner_id = payload.owner_id.or(group.owner_id);
            }
            return Ok(());
        };

        let old_name = payload
            .name
            .clone()
            .and_then(|name| guard.set_name(name));
        let old_position = payload
            .position
            .and_then(|position| guard.set_position(position));
        let old_topic = guard.set_topic(payload.topic.clone().unwrap_or_default());
        match &mut *guard {
            Channel::ServerText(text) => {
                text.nsfw = payload.nsfw;
                text.parent_id = payload.parent_id;
            }
            Channel::ServerVoice(voice) => {
                voice.parent_id = payload.parent_id;
                if let Some(bitrate) = payload.bitrate {
                    voice.bitrate = bitrate;
                }
                if let Some(user_limit) = payload.user_limit {
                    voice.user_limit = user_limit;
                }
            }
            _ => {}
        }
        let overwrite_changes = if payload.permission_overwrites.is_some() {
            guard.set_overwrites(builders::build_overwrites(&payload))
        } else {
            Vec::new()
        };
        drop(guard);

        let scopes = channel_scopes(payload.id, server_id);
        if let (Some(old_name), Some(new_name)) = (old_name, payload.name) {
            ctx.emit(
                Event::ServerChannelChangeName {
                    channel: channel.clone(),
                    old_name,
                    new_name,
                },
                &scopes,
            );
        }
        if let (Some(old_position), Some(new_position)) = (old_position, payload.position) {
            ctx.emit(
                Event::ServerChannelChangePosition {
                    channel: channel.clone(),
                    old_position,
                    new_position,
                },
                &scopes,
            );
        }
        for change in overwrite_changes {
            let target_scope = match change.target {
                OverwriteTarget::Role(id) => (EntityKind::Role, id),
                OverwriteTarget::Member(id) => (EntityKind::User, id),
            };
            ctx.emit(
                Event::ServerChannelChangeOverwrittenPermissions {
                    channel: channel.clone(),
                    target: change.target,
                    old_permissions: change.old,
                    new_permissions: change.new,
                },
                &[scopes[0], scopes[1], target_scope],
            );
        }
        if let Some(old_topic) = old_topic {
            ctx.emit(
                Event::ServerTextChannelChangeTopic {
                    channel,
                    old_topic,
                    new_topic: payload.topic.unwrap_or_default(),
                },
                &scopes,
            );
        }
        Ok(())
    }
}

pub struct ChannelDeleteHandler;

impl PacketHandler for ChannelDeleteHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::ChannelDelete
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: ChannelPayload = parse(data)?;
        let Some(channel) = ctx.cache.remove_channel(payload.id) else {
            return Ok(());
        };
        let server_id = channel.read().server_id();
        if let Some(server_id) = server_id {
            ctx.emit(
                Event::ServerChannelDelete { channel },
                &channel_scopes(payload.id, server_id),
            );
        }
        Ok(())
    }
}
