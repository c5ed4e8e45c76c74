//! Transport boundary
//!
//! The session only sees a [`Connection`]: a stream of inbound [`Frame`]s and a
//! sink of [`OutboundFrame`]s. [`TungsteniteConnector`] provides the real
//! WebSocket; tests plug in an in-memory one.

mod compression;
mod error;
mod sender;
mod websocket;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};

pub use compression::inflate;
pub use error::TransportError;
pub use sender::GatewaySender;
pub use websocket::TungsteniteConnector;

/// Inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    /// zlib-compressed JSON
    Binary(Vec<u8>),
    /// The remote closed the connection, with its close code and reason if given
    Close(Option<(u16, String)>),
}

/// Outbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: String },
}

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;
pub type FrameSink = Pin<Box<dyn Sink<OutboundFrame, Error = TransportError> + Send>>;

/// An open duplex connection
pub struct Connection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens connections to a gateway URL
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError>;
}
