//! Dispatch packet handlers
//!
//! Every dispatch type the client understands has one [`PacketHandler`]. The
//! [`PacketRouter`] looks the handler up by the packet's `t` tag; handlers
//! mutate the cache and hand the resulting events to the dispatcher.

mod builders;
mod channel;
mod error;
mod message;
mod member;
mod presence;
mod server;
mod session;

use std::collections::HashMap;
use std::sync::Arc;

use cord_cache::EntityCache;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::broadcast::EventDispatcher;
use crate::events::DispatchType;
use crate::listener::{Event, Scope};
use crate::transport::GatewaySender;

pub use channel::{ChannelCreateHandler, ChannelDeleteHandler, ChannelUpdateHandler};
pub use error::{HandlerError, HandlerResult};
pub use member::{
    GuildMemberAddHandler, GuildMemberRemoveHandler, GuildMemberUpdateHandler,
    GuildMembersChunkHandler,
};
pub use message::{
    MessageCreateHandler, MessageDeleteBulkHandler, MessageDeleteHandler, MessageUpdateHandler,
    ReactionAddHandler, ReactionRemoveHandler,
};
pub use presence::{PresenceUpdateHandler, TypingStartHandler};
pub use server::{
    GuildCreateHandler, GuildDeleteHandler, GuildEmojisUpdateHandler, GuildUpdateHandler,
};
pub use session::{ReadyHandler, ResumedHandler};

/// Everything a handler may touch
#[derive(Clone)]
pub struct HandlerContext {
    pub cache: Arc<EntityCache>,
    pub dispatcher: Arc<EventDispatcher>,
    /// Replies such as member requests go out through this
    pub sender: GatewaySender,
}

impl HandlerContext {
    pub fn new(
        cache: Arc<EntityCache>,
        dispatcher: Arc<EventDispatcher>,
        sender: GatewaySender,
    ) -> Self {
        Self {
            cache,
            dispatcher,
            sender,
        }
    }

    /// Queue an event, most specific scope first
    pub fn emit(&self, event: Event, scopes: &[Scope]) {
        self.dispatcher.dispatch(event, scopes);
    }
}

/// Handles one dispatch type
pub trait PacketHandler: Send + Sync {
    fn dispatch_type(&self) -> DispatchType;

    fn handle(&self, ctx: &HandlerContext, data: &Value) -> HandlerResult<()>;
}

/// Decode a dispatch payload
pub(crate) fn parse<T: DeserializeOwned>(data: &Value) -> HandlerResult<T> {
    Ok(T::deserialize(data)?)
}

/// Maps dispatch tags to their handlers
pub struct PacketRouter {
    handlers: HashMap<&'static str, Box<dyn PacketHandler>>,
}

impl PacketRouter {
    /// Router without any handlers
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, replacing any previous one for the same type
    pub fn register(&mut self, handler: Box<dyn PacketHandler>) {
        self.handlers
            .insert(handler.dispatch_type().as_str(), handler);
    }

    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler for `event_type`.
    ///
    /// Returns `Ok(false)` for tags without a handler; those packets are ignored.
    pub fn route(
        &self,
        ctx: &HandlerContext,
        event_type: &str,
        data: &Value,
    ) -> HandlerResult<bool> {
        let Some(handler) = self.handlers.get(event_type) else {
            tracing::debug!(event_type, "Ignoring unhandled dispatch");
            return Ok(false);
        };
        handler.handle(ctx, data)?;
        Ok(true)
    }
}

impl Default for PacketRouter {
    /// Router with a handler for every known dispatch type
    fn default() -> Self {
        let handlers: [Box<dyn PacketHandler>; 21] = [
            Box::new(ReadyHandler),
            Box::new(ResumedHandler),
            Box::new(GuildCreateHandler),
            Box::new(GuildUpdateHandler),
            Box::new(GuildDeleteHandler),
            Box::new(GuildMembersChunkHandler),
            Box::new(GuildMemberAddHandler),
            Box::new(GuildMemberRemoveHandler),
            Box::new(GuildMemberUpdateHandler),
            Box::new(GuildEmojisUpdateHandler),
            Box::new(ChannelCreateHandler),
            Box::new(ChannelUpdateHandler),
            Box::new(ChannelDeleteHandler),
            Box::new(MessageCreateHandler),
            Box::new(MessageUpdateHandler),
            Box::new(MessageDeleteHandler),
            Box::new(MessageDeleteBulkHandler),
            Box::new(ReactionAddHandler),
            Box::new(ReactionRemoveHandler),
            Box::new(PresenceUpdateHandler),
            Box::new(TypingStartHandler),
        ];

        let mut router = Self::empty();
        for handler in handlers {
            router.register(handler);
        }
        router
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_router_covers_every_dispatch_type() {
        let router = PacketRouter::default();
        assert_eq!(router.len(), DispatchType::ALL.len());
        for dispatch_type in DispatchType::ALL {
            assert!(router.handles(dispatch_type.as_str()), "{dispatch_type}");
        }
    }

    #[test]
    fn test_unknown_dispatch_ignored() {
        let (ctx, _outbound) = context();
        let handled = PacketRouter::default()
            .route(&ctx, "SOMETHING_NEW", &json!({"id": "1"}))
            .unwrap();
        assert!(!handled);
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let (ctx, _outbound) = context();
        let result = route(&ctx, DispatchType::GuildDelete, &json!({"nope": true}));
        assert!(matches!(result, Err(HandlerError::InvalidPayload(_))));
    }
}
