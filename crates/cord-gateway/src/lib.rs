//! # cord-gateway
//!
//! Gateway session engine: keeps a persistent connection to the real-time
//! gateway alive, applies every dispatched packet to the entity cache and
//! notifies listeners of what changed.

pub mod broadcast;
pub mod client;
pub mod events;
pub mod handlers;
pub mod listener;
pub mod protocol;
pub mod session;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use listener::{EntityKind, Event, EventKind, Listener, ListenerId};
pub use session::{GatewayConfig, GatewayError, GatewayResult, SessionState};
