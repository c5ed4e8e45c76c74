//! Concurrent entity stores

mod entity_cache;

pub use entity_cache::{Cached, EntityCache};
