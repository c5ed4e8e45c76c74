//! Listener registry
//!
//! Listeners are registered either globally for an event kind, or scoped to a
//! single entity: `(entity kind, entity ID, event kind)`. Each key maps to the
//! listeners in registration order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cord_core::Snowflake;
use dashmap::DashMap;

use super::event::{EntityKind, Event, EventKind, Scope};

/// Receives events on the listener thread
pub trait Listener: Send + Sync + 'static {
    /// Handle one event. An error is logged and does not affect other listeners.
    fn on_event(&self, event: &Event) -> anyhow::Result<()>;
}

impl<F> Listener for F
where
    F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn on_event(&self, event: &Event) -> anyhow::Result<()> {
        self(event)
    }
}

pub type SharedListener = Arc<dyn Listener>;

/// Handle returned on registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registration key of a scoped listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub entity: EntityKind,
    pub id: Snowflake,
    pub event: EventKind,
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Global(EventKind),
    Scoped(ListenerKey),
}

type Entries = Vec<(ListenerId, SharedListener)>;

/// Concurrent listener storage
#[derive(Default)]
pub struct ListenerRegistry {
    global: DashMap<EventKind, Entries>,
    scoped: DashMap<ListenerKey, Entries>,
    slots: DashMap<ListenerId, Slot>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a listener for every event of `kind`
    pub fn add(&self, kind: EventKind, listener: SharedListener) -> ListenerId {
        let id = self.next_id();
        self.global.entry(kind).or_default().push((id, listener));
        self.slots.insert(id, Slot::Global(kind));
        id
    }

    /// Register a listener for events of `kind` concerning one entity
    pub fn add_scoped(
        &self,
        entity: EntityKind,
        entity_id: Snowflake,
        kind: EventKind,
        listener: SharedListener,
    ) -> ListenerId {
        let id = self.next_id();
        let key = ListenerKey {
            entity,
            id: entity_id,
            event: kind,
        };
        self.scoped.entry(key).or_default().push((id, listener));
        self.slots.insert(id, Slot::Scoped(key));
        id
    }

    /// Unregister a listener; returns false if it was not registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let Some((_, slot)) = self.slots.remove(&id) else {
            return false;
        };
        match slot {
            Slot::Global(kind) => {
                if let Some(mut entries) = self.global.get_mut(&kind) {
                    entries.retain(|(entry_id, _)| *entry_id != id);
                }
                self.global.remove_if(&kind, |_, entries| entries.is_empty());
            }
            Slot::Scoped(key) => {
                if let Some(mut entries) = self.scoped.get_mut(&key) {
                    entries.retain(|(entry_id, _)| *entry_id != id);
                }
                self.scoped.remove_if(&key, |_, entries| entries.is_empty());
            }
        }
        true
    }

    /// Listeners interested in an event of `kind`.
    ///
    /// `scopes` are the affected entities, most specific first. The result is
    /// the scoped listeners of each scope in that order, followed by the global ones.
    pub fn resolve(&self, kind: EventKind, scopes: &[Scope]) -> Vec<SharedListener> {
        let mut listeners = Vec::new();
        for &(entity, id) in scopes {
            let key = ListenerKey {
                entity,
                id,
                event: kind,
            };
            if let Some(entries) = self.scoped.get(&key) {
                listeners.extend(entries.iter().map(|(_, l)| l.clone()));
            }
        }
        if let Some(entries) = self.global.get(&kind) {
            listeners.extend(entries.iter().map(|(_, l)| l.clone()));
        }
        listeners
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> SharedListener {
        let log = log.clone();
        Arc::new(move |_: &Event| -> anyhow::Result<()> {
            log.lock().push(name);
            Ok(())
        })
    }

    fn deliver(listeners: &[SharedListener]) {
        for listener in listeners {
            listener.on_event(&Event::Ready).unwrap();
        }
    }

    #[test]
    fn test_resolve_orders_scopes_then_global() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let channel = Snowflake::new(20);
        let server = Snowflake::new(10);

        registry.add(EventKind::MessageCreate, recording(&log, "global"));
        registry.add_scoped(EntityKind::Server, server, EventKind::MessageCreate, recording(&log, "server"));
        registry.add_scoped(EntityKind::Channel, channel, EventKind::MessageCreate, recording(&log, "channel"));

        let listeners = registry.resolve(
            EventKind::MessageCreate,
            &[(EntityKind::Channel, channel), (EntityKind::Server, server)],
        );
        deliver(&listeners);
        assert_eq!(*log.lock(), vec!["channel", "server", "global"]);
    }

    #[test]
    fn test_resolve_filters_by_kind_and_entity() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.add(EventKind::MessageDelete, recording(&log, "other kind"));
        registry.add_scoped(
            EntityKind::Channel,
            Snowflake::new(99),
            EventKind::MessageCreate,
            recording(&log, "other channel"),
        );

        let listeners = registry.resolve(
            EventKind::MessageCreate,
            &[(EntityKind::Channel, Snowflake::new(20))],
        );
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_registration_order_is_kept() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.add(EventKind::Ready, recording(&log, "first"));
        registry.add(EventKind::Ready, recording(&log, "second"));

        deliver(&registry.resolve(EventKind::Ready, &[]));
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_remove() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let global = registry.add(EventKind::Ready, recording(&log, "global"));
        let scoped = registry.add_scoped(
            EntityKind::User,
            Snowflake::new(1),
            EventKind::Ready,
            recording(&log, "scoped"),
        );
        assert_eq!(registry.len(), 2);

        assert!(registry.remove(global));
        assert!(!registry.remove(global));
        assert!(registry.remove(scoped));
        assert!(registry.is_empty());
        assert!(registry
            .resolve(EventKind::Ready, &[(EntityKind::User, Snowflake::new(1))])
            .is_empty());
    }
}
