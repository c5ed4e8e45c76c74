//! Event dispatcher
//!
//! Hands realized events to a single dedicated listener thread. Deliveries are
//! processed strictly in submission order, so listeners observe events in the
//! order their packets were applied, and a slow listener never stalls the read loop.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;

use crate::listener::{Event, ListenerRegistry, Scope, SharedListener};

/// Name of the listener thread
pub const LISTENER_THREAD_NAME: &str = "cord-listeners";

struct Delivery {
    event: Event,
    listeners: Vec<SharedListener>,
}

/// Resolves listeners for an event and queues the delivery
pub struct EventDispatcher {
    registry: Arc<ListenerRegistry>,
    sender: mpsc::UnboundedSender<Delivery>,
}

impl EventDispatcher {
    /// Spawn the listener thread. It exits once the dispatcher is dropped.
    pub fn start(registry: Arc<ListenerRegistry>) -> std::io::Result<Arc<Self>> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Delivery>();

        thread::Builder::new()
            .name(LISTENER_THREAD_NAME.to_string())
            .spawn(move || {
                while let Some(delivery) = receiver.blocking_recv() {
                    deliver(&delivery);
                }
                tracing::debug!("Listener thread stopped");
            })?;

        tracing::debug!("Listener thread started");
        Ok(Arc::new(Self { registry, sender }))
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// Queue `event` for the listeners of `scopes` (most specific first) and the global ones
    pub fn dispatch(&self, event: Event, scopes: &[Scope]) {
        let listeners = self.registry.resolve(event.kind(), scopes);
        if listeners.is_empty() {
            tracing::trace!(event = %event.kind(), "No listeners registered");
            return;
        }
        if self.sender.send(Delivery { event, listeners }).is_err() {
            tracing::warn!("Listener thread is gone, dropping event");
        }
    }
}

fn deliver(delivery: &Delivery) {
    let kind = delivery.event.kind();
    for listener in &delivery.listeners {
        match catch_unwind(AssertUnwindSafe(|| listener.on_event(&delivery.event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(event = %kind, error = %e, "Listener returned an error");
            }
            Err(_) => {
                tracing::error!(event = %kind, "Listener panicked");
            }
        }
    }
}
