//! Handler error types

use cord_cache::CacheError;
use cord_core::Snowflake;
use thiserror::Error;

use crate::transport::TransportError;

/// Handler error type
///
/// Any of these aborts the one packet being handled; the session carries on.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Payload did not have the expected shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A required field was absent
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The packet refers to an entity that is not cached
    #[error("Unknown {kind} {id}")]
    UnresolvedEntity { kind: &'static str, id: Snowflake },

    /// Cache rejected the write
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// A reply packet could not be sent
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl HandlerError {
    pub(crate) const fn unresolved(kind: &'static str, id: Snowflake) -> Self {
        Self::UnresolvedEntity { kind, id }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidPayload(e.to_string())
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
