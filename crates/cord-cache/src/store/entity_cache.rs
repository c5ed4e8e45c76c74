//! Entity cache
//!
//! One `DashMap` per entity kind, each entity behind its own `RwLock`.
//! Handlers on the read loop, the hydration waiter, the message sweep and
//! application threads all access it concurrently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use cord_core::{Channel, CustomEmoji, Message, Server, Snowflake, User};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};

use crate::error::{CacheError, CacheResult};
use crate::messages::{MessageCache, MessageCacheConfig};

/// Shared handle to a cached entity
pub type Cached<T> = Arc<RwLock<T>>;

/// In-memory view of the remote state
pub struct EntityCache {
    users: DashMap<Snowflake, Cached<User>>,
    servers: DashMap<Snowflake, Cached<Server>>,
    channels: DashMap<Snowflake, Cached<Channel>>,
    custom_emojis: DashMap<Snowflake, Cached<CustomEmoji>>,
    messages: DashMap<Snowflake, Cached<Message>>,

    /// Message retention per text-bearing channel
    message_caches: DashMap<Snowflake, MessageCache>,
    message_config: RwLock<MessageCacheConfig>,

    /// Servers known to exist but not yet received
    unavailable_servers: DashSet<Snowflake>,
    /// Serializes moves between `servers` and `unavailable_servers`
    availability: Mutex<()>,

    yourself: RwLock<Option<Snowflake>>,
    hydrating: AtomicBool,
    last_member_chunk: Mutex<Option<tokio::time::Instant>>,
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new(MessageCacheConfig::default())
    }
}

fn get_or_create<T>(
    map: &DashMap<Snowflake, Cached<T>>,
    id: Snowflake,
    make: impl FnOnce() -> T,
) -> Cached<T> {
    map.entry(id)
        .or_insert_with(|| Arc::new(RwLock::new(make())))
        .value()
        .clone()
}

fn try_get_or_create<T, E>(
    map: &DashMap<Snowflake, Cached<T>>,
    id: Snowflake,
    make: impl FnOnce() -> Result<T, E>,
) -> Result<Cached<T>, E> {
    match map.entry(id) {
        Entry::Occupied(entry) => Ok(entry.get().clone()),
        Entry::Vacant(entry) => {
            let value = Arc::new(RwLock::new(make()?));
            Ok(entry.insert(value).value().clone())
        }
    }
}

fn lookup<T>(map: &DashMap<Snowflake, Cached<T>>, id: Snowflake) -> Option<Cached<T>> {
    map.get(&id).map(|entry| entry.value().clone())
}

fn all<T>(map: &DashMap<Snowflake, Cached<T>>) -> Vec<Cached<T>> {
    map.iter().map(|entry| entry.value().clone()).collect()
}

impl EntityCache {
    /// Create an empty cache
    #[must_use]
    pub fn new(message_config: MessageCacheConfig) -> Self {
        Self {
            users: DashMap::new(),
            servers: DashMap::new(),
            channels: DashMap::new(),
            custom_emojis: DashMap::new(),
            messages: DashMap::new(),
            message_caches: DashMap::new(),
            message_config: RwLock::new(message_config),
            unavailable_servers: DashSet::new(),
            availability: Mutex::new(()),
            yourself: RwLock::new(None),
            hydrating: AtomicBool::new(false),
            last_member_chunk: Mutex::new(None),
        }
    }

    /// Create a new cache wrapped in Arc
    #[must_use]
    pub fn new_shared(message_config: MessageCacheConfig) -> Arc<Self> {
        Arc::new(Self::new(message_config))
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub fn user(&self, id: Snowflake) -> Option<Cached<User>> {
        lookup(&self.users, id)
    }

    pub fn users(&self) -> Vec<Cached<User>> {
        all(&self.users)
    }

    /// Return the cached user, building it with `make` only if absent.
    ///
    /// Atomic per ID: concurrent callers always share one instance.
    pub fn get_or_create_user(&self, id: Snowflake, make: impl FnOnce() -> User) -> Cached<User> {
        get_or_create(&self.users, id, make)
    }

    /// Like [`get_or_create_user`](Self::get_or_create_user) for builders that can fail
    pub fn try_get_or_create_user<E>(
        &self,
        id: Snowflake,
        make: impl FnOnce() -> Result<User, E>,
    ) -> Result<Cached<User>, E> {
        try_get_or_create(&self.users, id, make)
    }

    pub fn remove_user(&self, id: Snowflake) -> Option<Cached<User>> {
        self.users.remove(&id).map(|(_, user)| user)
    }

    /// Record the account this client is logged in as
    pub fn set_yourself(&self, id: Snowflake) {
        *self.yourself.write() = Some(id);
    }

    pub fn yourself_id(&self) -> Option<Snowflake> {
        *self.yourself.read()
    }

    pub fn yourself(&self) -> Option<Cached<User>> {
        self.yourself_id().and_then(|id| self.user(id))
    }

    // ------------------------------------------------------------------
    // Servers
    // ------------------------------------------------------------------

    pub fn server(&self, id: Snowflake) -> Option<Cached<Server>> {
        lookup(&self.servers, id)
    }

    pub fn servers(&self) -> Vec<Cached<Server>> {
        all(&self.servers)
    }

    /// Store a server, taking it out of the unavailable set. An existing entry is replaced.
    pub fn add_server(&self, server: Server) -> Cached<Server> {
        let id = server.id;
        let server = Arc::new(RwLock::new(server));

        let _guard = self.availability.lock();
        self.unavailable_servers.remove(&id);
        self.servers.insert(id, server.clone());
        server
    }

    /// Remove a server together with its channels, their messages and its emojis
    pub fn remove_server(&self, id: Snowflake) -> Option<Cached<Server>> {
        let removed = {
            let _guard = self.availability.lock();
            self.servers.remove(&id).map(|(_, server)| server)
        };
        if let Some(server) = &removed {
            self.drop_server_contents(server);
        }
        removed
    }

    /// Move a server into the unavailable set, dropping its cached contents
    pub fn mark_server_unavailable(&self, id: Snowflake) -> Option<Cached<Server>> {
        let removed = {
            let _guard = self.availability.lock();
            self.unavailable_servers.insert(id);
            self.servers.remove(&id).map(|(_, server)| server)
        };
        if let Some(server) = &removed {
            self.drop_server_contents(server);
        }
        removed
    }

    fn drop_server_contents(&self, server: &Cached<Server>) {
        let (channel_ids, emoji_ids): (Vec<_>, Vec<_>) = {
            let server = server.read();
            (
                server.channel_ids.iter().copied().collect(),
                server.emoji_ids.iter().copied().collect(),
            )
        };
        for channel_id in channel_ids {
            self.drop_channel(channel_id);
        }
        for emoji_id in emoji_ids {
            self.custom_emojis.remove(&emoji_id);
        }
    }

    pub fn is_server_unavailable(&self, id: Snowflake) -> bool {
        self.unavailable_servers.contains(&id)
    }

    pub fn unavailable_server_count(&self) -> usize {
        self.unavailable_servers.len()
    }

    pub fn unavailable_server_ids(&self) -> Vec<Snowflake> {
        self.unavailable_servers.iter().map(|id| *id).collect()
    }

    /// No server is pending and every server has received all advertised members
    pub fn all_servers_loaded(&self) -> bool {
        self.unavailable_servers.is_empty()
            && self
                .servers()
                .iter()
                .all(|server| server.read().is_fully_loaded())
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    pub fn channel(&self, id: Snowflake) -> Option<Cached<Channel>> {
        lookup(&self.channels, id)
    }

    pub fn channels(&self) -> Vec<Cached<Channel>> {
        all(&self.channels)
    }

    /// Channels belonging to a server
    pub fn server_channels(&self, server_id: Snowflake) -> Vec<Cached<Channel>> {
        let Some(server) = self.server(server_id) else {
            return Vec::new();
        };
        let ids: Vec<Snowflake> = server.read().channel_ids.iter().copied().collect();
        ids.into_iter().filter_map(|id| self.channel(id)).collect()
    }

    /// Group direct message channels
    pub fn group_channels(&self) -> Vec<Cached<Channel>> {
        self.channels
            .iter()
            .filter(|entry| matches!(*entry.value().read(), Channel::Group(_)))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Store a channel. Server channels are registered with their server, which must be cached.
    pub fn add_channel(&self, channel: Channel) -> CacheResult<Cached<Channel>> {
        let id = channel.id();
        if let Some(server_id) = channel.server_id() {
            let server = self
                .server(server_id)
                .ok_or(CacheError::UnknownServer(server_id))?;
            server.write().channel_ids.insert(id);
        }
        if channel.is_text_bearing() {
            let config = *self.message_config.read();
            self.message_caches
                .entry(id)
                .or_insert_with(|| MessageCache::new(config));
        }

        let channel = Arc::new(RwLock::new(channel));
        self.channels.insert(id, channel.clone());
        Ok(channel)
    }

    /// Remove a channel and every message cached for it
    pub fn remove_channel(&self, id: Snowflake) -> Option<Cached<Channel>> {
        let removed = self.drop_channel(id)?;
        let server_id = removed.read().server_id();
        if let Some(server) = server_id.and_then(|server_id| self.server(server_id)) {
            server.write().channel_ids.remove(&id);
        }
        Some(removed)
    }

    fn drop_channel(&self, id: Snowflake) -> Option<Cached<Channel>> {
        if let Some((_, cache)) = self.message_caches.remove(&id) {
            for message_id in cache.ids() {
                self.messages.remove(&message_id);
            }
        }
        self.channels.remove(&id).map(|(_, channel)| channel)
    }

    // ------------------------------------------------------------------
    // Custom emojis
    // ------------------------------------------------------------------

    pub fn custom_emoji(&self, id: Snowflake) -> Option<Cached<CustomEmoji>> {
        lookup(&self.custom_emojis, id)
    }

    pub fn custom_emojis(&self) -> Vec<Cached<CustomEmoji>> {
        all(&self.custom_emojis)
    }

    /// Store an emoji of a cached server; an existing entry is returned unchanged
    pub fn get_or_create_custom_emoji(
        &self,
        emoji: CustomEmoji,
    ) -> CacheResult<Cached<CustomEmoji>> {
        let server = self
            .server(emoji.server_id)
            .ok_or(CacheError::UnknownServer(emoji.server_id))?;
        server.write().emoji_ids.insert(emoji.id);
        Ok(get_or_create(&self.custom_emojis, emoji.id, || emoji))
    }

    pub fn remove_custom_emoji(&self, id: Snowflake) -> Option<Cached<CustomEmoji>> {
        let (_, removed) = self.custom_emojis.remove(&id)?;
        let server_id = removed.read().server_id;
        if let Some(server) = self.server(server_id) {
            server.write().emoji_ids.remove(&id);
        }
        Some(removed)
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    pub fn message(&self, id: Snowflake) -> Option<Cached<Message>> {
        lookup(&self.messages, id)
    }

    /// Cached messages of a channel, oldest first
    pub fn channel_messages(&self, channel_id: Snowflake) -> Vec<Cached<Message>> {
        let ids = self
            .message_caches
            .get(&channel_id)
            .map(|cache| cache.ids())
            .unwrap_or_default();
        ids.into_iter().filter_map(|id| self.message(id)).collect()
    }

    /// Whether a message could be cached in `channel_id` right now
    pub fn check_message_channel(&self, channel_id: Snowflake) -> CacheResult<()> {
        if self.message_caches.contains_key(&channel_id) {
            Ok(())
        } else if self.channels.contains_key(&channel_id) {
            Err(CacheError::NotTextBearing(channel_id))
        } else {
            Err(CacheError::UnknownChannel(channel_id))
        }
    }

    /// Cache a message in its channel. An already cached message is returned unchanged.
    pub fn get_or_create_message(&self, message: Message) -> CacheResult<Cached<Message>> {
        let id = message.id;
        let channel_id = message.channel_id;

        let mut cache = self
            .message_caches
            .get_mut(&channel_id)
            .ok_or_else(|| {
                if self.channels.contains_key(&channel_id) {
                    CacheError::NotTextBearing(channel_id)
                } else {
                    CacheError::UnknownChannel(channel_id)
                }
            })?;
        let message = get_or_create(&self.messages, id, || message);
        cache.push(id, Instant::now());
        Ok(message)
    }

    pub fn remove_message(&self, id: Snowflake) -> Option<Cached<Message>> {
        let (_, removed) = self.messages.remove(&id)?;
        let channel_id = removed.read().channel_id;
        if let Some(mut cache) = self.message_caches.get_mut(&channel_id) {
            cache.remove(id);
        }
        Some(removed)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn message_cache_config(&self) -> MessageCacheConfig {
        *self.message_config.read()
    }

    /// Change retention for new and existing channel caches
    pub fn set_message_cache_config(&self, config: MessageCacheConfig) {
        *self.message_config.write() = config;
        for mut cache in self.message_caches.iter_mut() {
            cache.set_config(config);
        }
    }

    /// Evict ineligible messages from every channel, returning how many were dropped
    pub fn sweep_messages(&self) -> usize {
        self.sweep_messages_at(Instant::now())
    }

    /// Sweep as if the current time were `now`
    pub fn sweep_messages_at(&self, now: Instant) -> usize {
        let evicted: Vec<Snowflake> = self
            .message_caches
            .iter_mut()
            .flat_map(|mut cache| cache.sweep(now))
            .collect();
        for id in &evicted {
            self.messages.remove(id);
        }
        evicted.len()
    }

    // ------------------------------------------------------------------
    // Hydration
    // ------------------------------------------------------------------

    /// Enter the post-ready window in which the cache is rebuilt
    pub fn begin_hydration(&self) {
        self.hydrating.store(true, Ordering::SeqCst);
        *self.last_member_chunk.lock() = None;
    }

    pub fn end_hydration(&self) {
        self.hydrating.store(false, Ordering::SeqCst);
    }

    pub fn is_hydrating(&self) -> bool {
        self.hydrating.load(Ordering::SeqCst)
    }

    /// Record that a member chunk arrived. Timed on the tokio clock, like the
    /// hydration wait.
    pub fn note_member_chunk(&self) {
        *self.last_member_chunk.lock() = Some(tokio::time::Instant::now());
    }

    pub fn last_member_chunk(&self) -> Option<tokio::time::Instant> {
        *self.last_member_chunk.lock()
    }

    /// Clear every store. Only legal while hydrating.
    pub fn purge(&self) -> CacheResult<()> {
        if !self.is_hydrating() {
            return Err(CacheError::PurgeWhileConnected);
        }

        {
            let _guard = self.availability.lock();
            self.servers.clear();
            self.unavailable_servers.clear();
        }
        self.users.clear();
        self.channels.clear();
        self.custom_emojis.clear();
        self.message_caches.clear();
        self.messages.clear();

        tracing::debug!("Entity cache purged");
        Ok(())
    }
}
