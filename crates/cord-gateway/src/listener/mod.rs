//! Listener registration
//!
//! Application-facing event types and the registry mapping them to listeners.

mod event;
mod registry;

pub use event::{EntityKind, Event, EventKind, Scope};
pub use registry::{Listener, ListenerId, ListenerKey, ListenerRegistry, SharedListener};
