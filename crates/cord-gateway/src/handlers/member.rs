//! Server membership: member chunks, joins, leaves and member updates

use std::collections::HashSet;

use serde_json::Value;

use super::{builders, parse, HandlerContext, HandlerError, HandlerResult, PacketHandler};
use crate::events::{
    DispatchType, GuildMemberAddPayload, GuildMemberRemovePayload, GuildMemberUpdatePayload,
    GuildMembersChunkPayload,
};
use crate::listener::{EntityKind, Event};

/// Members requested with op 8 arrive in chunks
pub struct GuildMembersChunkHandler;

impl PacketHandler for GuildMembersChunkHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::GuildMembersChunk
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        ctx.cache.note_member_chunk();
        let payload: GuildMembersChunkPayload = parse(data)?;
        let server = ctx
            .cache
            .server(payload.guild_id)
            .ok_or_else(|| HandlerError::unresolved("server", payload.guild_id))?;

        let members = payload
            .members
            .iter()
            .map(|member| builders::build_member(&ctx.cache, member))
            .collect::<HandlerResult<Vec<_>>>()?;

        let mut server = server.write();
        for member in members {
            server.add_member(member);
        }
        tracing::debug!(
            server_id = %payload.guild_id,
            chunk = payload.members.len(),
            loaded = server.members.len(),
            total = server.member_count,
            "Member chunk"
        );
        Ok(())
    }
}

pub struct GuildMemberAddHandler;

impl PacketHandler for GuildMemberAddHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::GuildMemberAdd
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: GuildMemberAddPayload = parse(data)?;
        let server = ctx
            .cache
            .server(payload.guild_id)
            .ok_or_else(|| HandlerError::unresolved("server", payload.guild_id))?;

        let member = builders::build_member(&ctx.cache, &payload.member)?;
        let user_id = member.user_id;
        {
            let mut server = server.write();
            server.add_member(member);
            server.member_count = server.member_count.saturating_add(1);
        }

        let user = builders::get_or_create_user(&ctx.cache, &payload.member.user)?;
        ctx.emit(
            Event::ServerMemberAdd { server, user },
            &[
                (EntityKind::User, user_id),
                (EntityKind::Server, payload.guild_id),
            ],
        );
        Ok(())
    }
}

pub struct GuildMemberRemoveHandler;

impl PacketHandler for GuildMemberRemoveHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::GuildMemberRemove
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: GuildMemberRemovePayload = parse(data)?;
        let server = ctx
            .cache
            .server(payload.guild_id)
            .ok_or_else(|| HandlerError::unresolved("server", payload.guild_id))?;
        let user = builders::get_or_create_user(&ctx.cache, &payload.user)?;

        {
            let mut server = server.write();
            if server.remove_member(payload.user.id).is_some() {
                server.member_count = server.member_count.saturating_sub(1);
            }
        }

        ctx.emit(
            Event::ServerMemberRemove { server, user },
            &[
                (EntityKind::User, payload.user.id),
                (EntityKind::Server, payload.guild_id),
            ],
        );
        Ok(())
    }
}

/// Nickname and role changes of a member
pub struct GuildMemberUpdateHandler;

impl PacketHandler for GuildMemberUpdateHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::GuildMemberUpdate
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let payload: GuildMemberUpdatePayload = parse(data)?;
        let server_id = payload.guild_id;
        let user_id = payload.user.id;
        let server = ctx
            .cache
            .server(server_id)
            .ok_or_else(|| HandlerError::unresolved("server", server_id))?;
        let user = builders::get_or_create_user(&ctx.cache, &payload.user)?;

        let new_roles: HashSet<_> = payload.roles.iter().copied().collect();
        let (old_nickname, added, removed) = {
            let mut server = server.write();
            if let Some(unknown) = new_roles.iter().find(|id| server.role(**id).is_none()) {
                return Err(HandlerError::unresolved("role", *unknown));
            }
            let member = server
                .members
                .get_mut(&user_id)
                .ok_or_else(|| HandlerError::unresolved("member", user_id))?;

            let old_nickname = (member.nickname != payload.nick)
                .then(|| std::mem::replace(&mut member.nickname, payload.nick.clone()));
            let mut added: Vec<_> = new_roles.difference(&member.role_ids).copied().collect();
            let mut removed: Vec<_> = member.role_ids.difference(&new_roles).copied().collect();
            added.sort_unstable();
            removed.sort_unstable();
            member.role_ids = new_roles;
            (old_nickname, added, removed)
        };

        let user_scopes = [(EntityKind::User, user_id), (EntityKind::Server, server_id)];
        if let Some(old_nickname) = old_nickname {
            ctx.emit(
                Event::UserChangeNickname {
                    server: server.clone(),
                    user: user.clone(),
                    old_nickname,
                    new_nickname: payload.nick.clone(),
                },
                &user_scopes,
            );
        }
        for role_id in added {
            ctx.emit(
                Event::UserRoleAdd {
                    server: server.clone(),
                    user: user.clone(),
                    role_id,
                },
                &[
                    (EntityKind::Role, role_id),
                    (EntityKind::User, user_id),
                    (EntityKind::Server, server_id),
                ],
            );
        }
        for role_id in removed {
            ctx.emit(
                Event::UserRoleRemove {
                    server: server.clone(),
                    user: user.clone(),
                    role_id,
                },
                &[
                    (EntityKind::Role, role_id),
                    (EntityKind::User, user_id),
                    (EntityKind::Server, server_id),
                ],
            );
        }
        Ok(())
    }
}
