//! Session error types

use thiserror::Error;

use crate::transport::TransportError;

/// Gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway endpoint could not be looked up
    #[error("Failed to resolve gateway endpoint: {0}")]
    Resolve(#[from] reqwest::Error),

    /// The endpoint lookup answered with something unusable
    #[error("Invalid gateway endpoint response: {0}")]
    InvalidEndpoint(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// An outbound packet could not be encoded
    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The listener thread could not be spawned
    #[error("Failed to start listener thread: {0}")]
    ListenerThread(#[source] std::io::Error),

    /// The first session ended before it became ready
    #[error("Connection lost before the session became ready: {0}")]
    HandshakeFailed(String),

    /// The client was shut down
    #[error("Client disconnected")]
    Disconnected,
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;
