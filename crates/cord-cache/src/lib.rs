//! # cord-cache
//!
//! In-memory cache of the remote state observed on the gateway.
//!
//! ## Features
//!
//! - **Entity stores**: users, servers, channels, custom emojis and messages, one
//!   concurrent map per kind with atomic get-or-create
//! - **Availability tracking**: servers announced but not yet received
//! - **Message retention**: per-channel count and age limits enforced by a periodic sweep
//!
//! ## Example
//!
//! ```ignore
//! use cord_cache::{EntityCache, MessageCacheConfig, spawn_message_sweeper};
//!
//! let cache = EntityCache::new_shared(MessageCacheConfig::default());
//! let sweeper = spawn_message_sweeper(cache.clone(), Duration::from_secs(30));
//!
//! let user = cache.get_or_create_user(id, || User::new(id, name, discriminator));
//! ```

pub mod error;
pub mod messages;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use messages::{spawn_message_sweeper, MessageCache, MessageCacheConfig};
pub use store::{Cached, EntityCache};
