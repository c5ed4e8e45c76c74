//! Gateway session
//!
//! The connection state machine and the timers that belong to it.

mod backoff;
mod config;
mod endpoint;
mod error;
mod gateway;
mod heartbeat;
mod hydration;
mod state;

pub use backoff::{default_delay, default_reconnect_delay, ReconnectDelayFn};
pub use config::GatewayConfig;
pub use endpoint::{EndpointResolver, RestEndpointResolver, StaticEndpoint};
pub use error::{GatewayError, GatewayResult};
pub use gateway::GatewaySession;
pub use heartbeat::{HeartbeatController, SharedSequence};
pub use hydration::{wait_for_hydration, HydrationConfig, HydrationOutcome};
pub use state::SessionState;
