//! Transport error types

use thiserror::Error;

/// Transport error type
#[derive(Debug, Error)]
pub enum TransportError {
    /// WebSocket protocol or I/O failure
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// Binary frame could not be inflated
    #[error("Decompression failed: {0}")]
    Decompress(#[from] std::io::Error),

    /// Outbound packet could not be encoded
    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// No connection is currently open
    #[error("Not connected")]
    NotConnected,

    /// The connection was closed while in use
    #[error("Connection closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(e))
    }
}
