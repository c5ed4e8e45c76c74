//! Messages and reactions

use cord_cache::EntityCache;
use cord_core::{MessageAuthor, Snowflake};
use serde_json::Value;

use super::{builders, parse, HandlerContext, HandlerError, HandlerResult, PacketHandler};
use crate::events::{
    DispatchType, MessageDeleteBulkPayload, MessageDeletePayload, MessagePayload,
    MessageUpdatePayload, ReactionPayload,
};
use crate::listener::{EntityKind, Event, Scope};

/// Scopes of something that happened in a channel, most specific first.
///
/// Fails when the channel is not cached.
fn channel_scopes(
    cache: &EntityCache,
    message_id: Option<Snowflake>,
    channel_id: Snowflake,
) -> HandlerResult<Vec<Scope>> {
    let channel = cache
        .channel(channel_id)
        .ok_or_else(|| HandlerError::unresolved("channel", channel_id))?;
    let server_id = channel.read().server_id();

    let mut scopes = Vec::with_capacity(3);
    if let Some(message_id) = message_id {
        scopes.push((EntityKind::Message, message_id));
    }
    scopes.push((EntityKind::Channel, channel_id));
    if let Some(server_id) = server_id {
        scopes.push((EntityKind::Server, server_id));
    }
    Ok(scopes)
}

pub struct MessageCreateHandler;

impl PacketHandler for MessageCreateHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::MessageCreate
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: MessagePayload = parse(data)?;
        let mut scopes = channel_scopes(&ctx.cache, None, payload.channel_id)?;
        // before the author is cached
        ctx.cache.check_message_channel(payload.channel_id)?;

        let message = builders::build_message(&ctx.cache, &payload)?;
        if let MessageAuthor::User(author_id) = message.author {
            scopes.push((EntityKind::User, author_id));
        }
        let message = ctx.cache.get_or_create_message(message)?;
        ctx.emit(Event::MessageCreate { message }, &scopes);
        Ok(())
    }
}

/// Content edits. Updates without content (embeds resolving) are not edits.
pub struct MessageUpdateHandler;

impl PacketHandler for MessageUpdateHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::MessageUpdate
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: MessageUpdatePayload = parse(data)?;
        let scopes = channel_scopes(&ctx.cache, Some(payload.id), payload.channel_id)?;
        let Some(new_content) = payload.content else {
            return Ok(());
        };

        let cached = ctx.cache.message(payload.id);
        let old_content = match &cached {
            Some(message) => {
                let edited = message
                    .write()
                    .edit(new_content.clone(), payload.edited_timestamp);
                match edited {
                    Some(old) => Some(old),
                    None => return Ok(()),
                }
            }
            None => None,
        };

        ctx.emit(
            Event::MessageEdit {
                message_id: payload.id,
                channel_id: payload.channel_id,
                message: cached,
                old_content,
                new_content,
            },
            &scopes,
        );
        Ok(())
    }
}

fn delete_message(ctx: &HandlerContext, message_id: Snowflake, channel_id: Snowflake) -> HandlerResult<()> {
    let scopes = channel_scopes(&ctx.cache, Some(message_id), channel_id)?;
    let message = ctx.cache.remove_message(message_id);
    ctx.emit(
        Event::MessageDelete {
            message_id,
            channel_id,
            message,
        },
        &scopes,
    );
    Ok(())
}

pub struct MessageDeleteHandler;

impl PacketHandler for MessageDeleteHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::MessageDelete
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: MessageDeletePayload = parse(data)?;
        delete_message(ctx, payload.id, payload.channel_id)
    }
}

/// Emits one delete per message
pub struct MessageDeleteBulkHandler;

impl PacketHandler for MessageDeleteBulkHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::MessageDeleteBulk
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: MessageDeleteBulkPayload = parse(data)?;
        for id in payload.ids {
            delete_message(ctx, id, payload.channel_id)?;
        }
        Ok(())
    }
}

fn handle_reaction(ctx: &HandlerContext, data: &Value, added: bool) -> HandlerResult<()> {
    let payload: ReactionPayload = parse(data)?;
    let scopes = channel_scopes(&ctx.cache, Some(payload.message_id), payload.channel_id)?;
    let emoji = builders::build_emoji(&payload.emoji)?;

    if let Some(message) = ctx.cache.message(payload.message_id) {
        let you = ctx.cache.yourself_id() == Some(payload.user_id);
        let mut message = message.write();
        if added {
            message.add_reaction(emoji.clone(), you);
        } else {
            message.remove_reaction(&emoji, you);
        }
    }

    let event = if added {
        Event::ReactionAdd {
            message_id: payload.message_id,
            channel_id: payload.channel_id,
            user_id: payload.user_id,
            emoji,
        }
    } else {
        Event::ReactionRemove {
            message_id: payload.message_id,
            channel_id: payload.channel_id,
            user_id: payload.user_id,
            emoji,
        }
    };
    ctx.emit(event, &scopes);
    Ok(())
}

pub struct ReactionAddHandler;

impl PacketHandler for ReactionAddHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::MessageReactionAdd
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        handle_reaction(ctx, data, true)
    }
}

pub struct ReactionRemoveHandler;

impl PacketHandler for ReactionRemoveHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::MessageReactionRemove
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        handle_reaction(ctx, data, false)
    }
}
