//! Gateway close codes
//!
//! Codes the gateway closes the connection with, and whether the session may
//! come back after each of them.

/// Close code the client sends when it closes deliberately
pub const NORMAL_CLOSURE: u16 = 1000;

/// What a close code means for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDisposition {
    /// Transient, reconnect after the backoff delay
    Retry,
    /// The client's own settings are rejected; reconnecting cannot help
    Fatal,
}

/// Gateway-specific close codes (4000-4014, 4006 unassigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    NotAuthenticated = 4003,
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    InvalidSequence = 4007,
    RateLimited = 4008,
    SessionTimeout = 4009,
    InvalidShard = 4010,
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    DisallowedIntents = 4014,
}

impl CloseCode {
    const ALL: [Self; 14] = [
        Self::UnknownError,
        Self::UnknownOpcode,
        Self::DecodeError,
        Self::NotAuthenticated,
        Self::AuthenticationFailed,
        Self::AlreadyAuthenticated,
        Self::InvalidSequence,
        Self::RateLimited,
        Self::SessionTimeout,
        Self::InvalidShard,
        Self::ShardingRequired,
        Self::InvalidApiVersion,
        Self::InvalidIntents,
        Self::DisallowedIntents,
    ];

    /// Known gateway code, `None` for anything else (including 1000-range codes)
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_u16() == value)
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub const fn disposition(self) -> CloseDisposition {
        match self {
            Self::AuthenticationFailed
            | Self::InvalidShard
            | Self::ShardingRequired
            | Self::InvalidApiVersion
            | Self::InvalidIntents
            | Self::DisallowedIntents => CloseDisposition::Fatal,
            _ => CloseDisposition::Retry,
        }
    }

    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        matches!(self.disposition(), CloseDisposition::Retry)
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "unknown error",
            Self::UnknownOpcode => "unknown op code sent",
            Self::DecodeError => "payload could not be decoded",
            Self::NotAuthenticated => "payload sent before identifying",
            Self::AuthenticationFailed => "authentication failed",
            Self::AlreadyAuthenticated => "identified twice",
            Self::InvalidSequence => "invalid resume sequence",
            Self::RateLimited => "sending too fast",
            Self::SessionTimeout => "session timed out",
            Self::InvalidShard => "invalid shard",
            Self::ShardingRequired => "too many servers, sharding required",
            Self::InvalidApiVersion => "invalid gateway version",
            Self::InvalidIntents => "invalid intents",
            Self::DisallowedIntents => "intents not enabled for this account",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.description())
    }
}
