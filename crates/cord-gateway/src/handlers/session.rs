//! READY and RESUMED

use serde_json::Value;

use super::{builders, parse, HandlerContext, HandlerResult, PacketHandler};
use crate::events::{DispatchType, ReadyPayload};

/// Rebuilds the cache skeleton of a fresh session.
///
/// Runs inside the hydration window opened by the session: everything cached
/// by a previous session is dropped, every server of the shard is recorded as
/// unavailable until its GUILD_CREATE arrives.
pub struct ReadyHandler;

impl PacketHandler for ReadyHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::Ready
    }

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()> {
        let ready: ReadyPayload = parse(data)?;
        ctx.cache.purge()?;

        let yourself = builders::get_or_create_user(&ctx.cache, &ready.user)?;
        let yourself_id = yourself.read().id;
        ctx.cache.set_yourself(yourself_id);

        for guild in &ready.guilds {
            ctx.cache.mark_server_unavailable(guild.id);
        }
        for payload in &ready.private_channels {
            match builders::build_channel(&ctx.cache, payload, None) {
                Ok(Some(channel)) => {
                    ctx.cache.add_channel(channel)?;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(channel_id = %payload.id, error = %e, "Skipping private channel");
                }
            }
        }

        tracing::info!(
            user_id = %yourself_id,
            servers = ready.guilds.len(),
            gateway_version = ready.v,
            "Session ready, waiting for servers"
        );
        Ok(())
    }
}

/// The session bookkeeping of a resume happens in the session itself;
/// the cache is left as it was.
pub struct ResumedHandler;

impl PacketHandler for ResumedHandler {
    fn dispatch_type(&self) -> DispatchType {
        DispatchType::Resumed
    }

    fn handle(&self, _ctx: &HandlerContext, _data: &Value) -> HandlerResult<()> {
        tracing::debug!("Resumed, cache kept");
        Ok(())
    }
}
