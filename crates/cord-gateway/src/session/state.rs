//! Session lifecycle states

use std::fmt;

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No connection and none being attempted
    #[default]
    Disconnected,
    /// Opening the transport
    Connecting,
    /// Transport open, waiting for Hello
    AwaitingHello,
    /// Identify sent
    Identifying,
    /// Resume sent
    Resuming,
    /// READY received, cache hydrating
    Ready,
    /// Fully connected
    Connected,
}

impl SessionState {
    /// Whether a transport is currently open
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Disconnected | Self::Connecting)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
