//! Outbound packet handle
//!
//! A cloneable handle that writes to whichever connection is currently open.
//! Handlers, the heartbeat task and the application all send through it.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{OutboundFrame, TransportError};
use crate::protocol::GatewayMessage;

#[derive(Clone, Default)]
pub struct GatewaySender {
    current: Arc<Mutex<Option<mpsc::UnboundedSender<OutboundFrame>>>>,
}

impl GatewaySender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a packet on the open connection
    pub fn send(&self, message: &GatewayMessage) -> Result<(), TransportError> {
        let json = message.to_json()?;
        self.send_frame(OutboundFrame::Text(json))
    }

    /// Queue a close frame; the writer stops after sending it
    pub fn close(&self, code: u16, reason: impl Into<String>) -> Result<(), TransportError> {
        self.send_frame(OutboundFrame::Close {
            code,
            reason: reason.into(),
        })
    }

    fn send_frame(&self, frame: OutboundFrame) -> Result<(), TransportError> {
        let current = self.current.lock();
        let sender = current.as_ref().ok_or(TransportError::NotConnected)?;
        sender.send(frame).map_err(|_| TransportError::Closed)
    }

    /// Route packets to a new connection, returning the writer's queue
    pub(crate) fn attach(&self) -> mpsc::UnboundedReceiver<OutboundFrame> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.current.lock() = Some(sender);
        receiver
    }

    /// Stop accepting packets; the writer drains what is already queued
    pub(crate) fn detach(&self) {
        self.current.lock().take();
    }

    pub fn is_attached(&self) -> bool {
        self.current.lock().is_some()
    }
}
