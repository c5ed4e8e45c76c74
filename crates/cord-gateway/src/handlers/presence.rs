//! User presence and typing

use cord_core::UserStatus;
use serde_json::Value;

use super::{builders, parse, HandlerContext, HandlerResult, PacketHandler};
use crate::events::{DispatchType, PresencePayload, TypingStartPayload};
use crate::listener::{EntityKind, Event};

/// Status and game changes
pub struct PresenceUpdateHandler;

impl PacketHandler for PresenceUpdateHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::PresenceUpdate
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: PresencePayload = parse(data)?;
        let user_id = payload.user.id;

        // Presences of users never seen in full are not worth a cache entry
        let user = if payload.user.username.is_some() {
            builders::get_or_create_user(&ctx.cache, &payload.user)?
        } else if let Some(user) = ctx.cache.user(user_id) {
            user
        } else {
            tracing::trace!(user_id = %user_id, "Presence for unknown user");
            return Ok(());
        };

        let new_status = payload.status.as_deref().map(UserStatus::from_wire);
        let new_game = payload.game.as_ref().map(builders::build_game);
        let (old_status, old_game) = {
            let mut user = user.write();
            let old_status = new_status.and_then(|status| user.set_status(status));
            let old_game = user.set_game(new_game.clone());
            (old_status, old_game)
        };

        let scopes = [(EntityKind::User, user_id)];
        if let (Some(old_status), Some(new_status)) = (old_status, new_status) {
            ctx.emit(
                Event::UserChangeStatus {
                    user: user.clone(),
                    old_status,
                    new_status,
                },
                &scopes,
            );
        }
        if let Some(old_game) = old_game {
            ctx.emit(
                Event::UserChangeGame {
                    user,
                    old_game,
                    new_game,
                },
                &scopes,
            );
        }
        Ok(())
    }
}

pub struct TypingStartHandler;

impl PacketHandler for TypingStartHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::TypingStart
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: TypingStartPayload = parse(data)?;
        ctx.emit(
            Event::UserStartTyping {
                channel_id: payload.channel_id,
                user_id: payload.user_id,
            },
            &[
                (EntityKind::Channel, payload.channel_id),
                (EntityKind::User, payload.user_id),
            ],
        );
        Ok(())
    }
}
