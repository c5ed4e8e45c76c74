//! Event broadcasting
//!
//! Delivers events to registered listeners off the network path.

mod dispatcher;

pub use dispatcher::{EventDispatcher, LISTENER_THREAD_NAME};
