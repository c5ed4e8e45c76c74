//! Per-channel message retention and its periodic sweep.

mod message_cache;
mod sweeper;

pub use message_cache::{MessageCache, MessageCacheConfig};
pub use sweeper::spawn_message_sweeper;
