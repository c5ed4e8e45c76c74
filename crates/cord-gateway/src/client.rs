//! Application-facing client
//!
//! ```no_run
//! use cord_gateway::{Client, Event, EventKind, GatewayConfig};
//!
//! # async fn run() -> Result<(), cord_gateway::GatewayError> {
//! let client = Client::builder(GatewayConfig::new("token"))
//!     .listener(EventKind::MessageCreate, |event: &Event| -> anyhow::Result<()> {
//!         if let Event::MessageCreate { message } = event {
//!             println!("{}", message.read().content);
//!         }
//!         Ok(())
//!     })
//!     .connect()
//!     .await?;
//! # client.disconnect().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use cord_cache::{spawn_message_sweeper, Cached, EntityCache};
use cord_core::{Game, Snowflake, User};
use tokio::task::JoinHandle;

use crate::broadcast::EventDispatcher;
use crate::handlers::{HandlerContext, PacketRouter};
use crate::listener::{EntityKind, EventKind, Listener, ListenerId, ListenerRegistry};
use crate::protocol::{GatewayMessage, StatusUpdatePayload};
use crate::session::{
    EndpointResolver, GatewayConfig, GatewayError, GatewayResult, GatewaySession,
    ReconnectDelayFn, RestEndpointResolver, SessionState, StaticEndpoint,
};
use crate::transport::{Connector, GatewaySender, TungsteniteConnector};

/// Configures and connects a [`Client`]
pub struct ClientBuilder {
    config: GatewayConfig,
    connector: Option<Arc<dyn Connector>>,
    resolver: Option<Arc<dyn EndpointResolver>>,
    registry: Arc<ListenerRegistry>,
    reconnect_delay: Option<ReconnectDelayFn>,
}

impl ClientBuilder {
    fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            connector: None,
            resolver: None,
            registry: Arc::new(ListenerRegistry::new()),
            reconnect_delay: None,
        }
    }

    /// Use another transport
    #[must_use]
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Use another endpoint lookup
    #[must_use]
    pub fn resolver(mut self, resolver: impl EndpointResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Skip the endpoint lookup and connect to `url`
    #[must_use]
    pub fn gateway_url(self, url: impl Into<String>) -> Self {
        self.resolver(StaticEndpoint(url.into()))
    }

    /// Register a listener before connecting, so no early event is missed
    #[must_use]
    pub fn listener(self, kind: EventKind, listener: impl Listener) -> Self {
        self.registry.add(kind, Arc::new(listener));
        self
    }

    #[must_use]
    pub fn scoped_listener(
        self,
        entity: EntityKind,
        id: Snowflake,
        kind: EventKind,
        listener: impl Listener,
    ) -> Self {
        self.registry.add_scoped(entity, id, kind, Arc::new(listener));
        self
    }

    #[must_use]
    pub fn reconnect_delay(
        mut self,
        delay: impl Fn(u32) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.reconnect_delay = Some(Arc::new(delay));
        self
    }

    /// Resolve the endpoint, connect, and wait until the cache has hydrated.
    ///
    /// Fails if the endpoint cannot be resolved or the first session never
    /// becomes ready. Nothing is retried in that case.
    pub async fn connect(self) -> GatewayResult<Client> {
        let Self {
            config,
            connector,
            resolver,
            registry,
            reconnect_delay,
        } = self;

        let resolver = resolver.unwrap_or_else(|| {
            Arc::new(RestEndpointResolver::new(
                config.api_url.clone(),
                config.token.clone(),
            ))
        });
        let endpoint = resolver.resolve().await?;

        let dispatcher =
            EventDispatcher::start(Arc::clone(&registry)).map_err(GatewayError::ListenerThread)?;
        let cache = EntityCache::new_shared(config.message_cache);
        let sweeper = spawn_message_sweeper(Arc::clone(&cache), config.message_sweep_interval);
        let ctx = HandlerContext::new(Arc::clone(&cache), dispatcher, GatewaySender::new());
        let connector = connector.unwrap_or_else(|| Arc::new(TungsteniteConnector));

        let (session, ready) =
            GatewaySession::start(config, endpoint, connector, PacketRouter::default(), ctx);
        if let Some(delay) = reconnect_delay {
            session.set_reconnect_delay(delay);
        }

        let client = Client {
            session,
            cache,
            registry,
            sweeper,
        };
        match ready.await {
            Ok(Ok(())) => Ok(client),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(GatewayError::Disconnected),
        }
    }
}

/// A connected gateway client
pub struct Client {
    session: Arc<GatewaySession>,
    cache: Arc<EntityCache>,
    registry: Arc<ListenerRegistry>,
    sweeper: JoinHandle<()>,
}

impl Client {
    pub fn builder(config: GatewayConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    /// The account this client is logged in as
    pub fn yourself(&self) -> Option<Cached<User>> {
        self.cache.yourself()
    }

    pub fn session(&self) -> &Arc<GatewaySession> {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn add_listener(&self, kind: EventKind, listener: impl Listener) -> ListenerId {
        self.registry.add(kind, Arc::new(listener))
    }

    pub fn add_scoped_listener(
        &self,
        entity: EntityKind,
        id: Snowflake,
        kind: EventKind,
        listener: impl Listener,
    ) -> ListenerId {
        self.registry.add_scoped(entity, id, kind, Arc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.registry.remove(id)
    }

    /// Replace the reconnect delay function
    pub fn set_reconnect_delay(&self, delay: impl Fn(u32) -> Duration + Send + Sync + 'static) {
        self.session.set_reconnect_delay(Arc::new(delay));
    }

    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        self.session.reconnect_delay(attempt)
    }

    /// Show as online, playing `game` or nothing
    pub fn update_status(&self, game: Option<Game>) -> GatewayResult<()> {
        let payload = StatusUpdatePayload::online(game.as_ref());
        self.session.send(&GatewayMessage::status_update(&payload)?)
    }

    /// Close the connection, stop reconnecting and wait for the session to end
    pub async fn disconnect(&self) {
        self.session.disconnect();
        self.session.join().await;
        self.sweeper.abort();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.sweeper.abort();
        self.session.disconnect();
    }
}
