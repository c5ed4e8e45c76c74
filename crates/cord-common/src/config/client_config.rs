//! Client configuration
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Everything needed to start a gateway client
#[derive(Clone)]
pub struct ClientConfig {
    pub env: Environment,
    /// Bot token, sent in Identify/Resume and REST authorization
    pub token: String,
    /// Base URL of the REST API used to resolve the gateway endpoint
    pub api_url: String,
    pub gateway_version: u8,
    pub shard: u32,
    pub total_shards: u32,
    pub compress: bool,
    pub large_threshold: u32,
    /// Reconnect automatically after the connection drops
    pub reconnect: bool,
    pub message_cache_capacity: usize,
    pub message_cache_storage: Duration,
    pub message_sweep_interval: Duration,
    pub invalid_session_delay: Duration,
    pub hydration_poll_interval: Duration,
    pub hydration_stall_polls: u32,
    pub hydration_chunk_quiet: Duration,
}

// The token must never end up in logs
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("env", &self.env)
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("gateway_version", &self.gateway_version)
            .field("shard", &self.shard)
            .field("total_shards", &self.total_shards)
            .field("compress", &self.compress)
            .field("large_threshold", &self.large_threshold)
            .field("reconnect", &self.reconnect)
            .finish_non_exhaustive()
    }
}

// Default value functions
fn default_api_url() -> String {
    "https://discord.com/api/v6".to_string()
}

fn default_gateway_version() -> u8 {
    6
}

fn default_total_shards() -> u32 {
    1
}

fn default_large_threshold() -> u32 {
    250
}

fn default_message_cache_capacity() -> usize {
    50
}

fn default_message_cache_storage_secs() -> u64 {
    43_200 // 12 hours
}

fn default_message_sweep_interval_secs() -> u64 {
    30
}

fn default_invalid_session_delay_ms() -> u64 {
    5_000
}

fn default_hydration_poll_ms() -> u64 {
    100
}

fn default_hydration_stall_polls() -> u32 {
    20
}

fn default_hydration_chunk_quiet_ms() -> u64 {
    5_000
}

impl ClientConfig {
    /// Configuration with defaults for everything but the token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            env: Environment::default(),
            token: token.into(),
            api_url: default_api_url(),
            gateway_version: default_gateway_version(),
            shard: 0,
            total_shards: default_total_shards(),
            compress: true,
            large_threshold: default_large_threshold(),
            reconnect: true,
            message_cache_capacity: default_message_cache_capacity(),
            message_cache_storage: Duration::from_secs(default_message_cache_storage_secs()),
            message_sweep_interval: Duration::from_secs(default_message_sweep_interval_secs()),
            invalid_session_delay: Duration::from_millis(default_invalid_session_delay_ms()),
            hydration_poll_interval: Duration::from_millis(default_hydration_poll_ms()),
            hydration_stall_polls: default_hydration_stall_polls(),
            hydration_chunk_quiet: Duration::from_millis(default_hydration_chunk_quiet_ms()),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `CORD_TOKEN` is missing or a variable cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("CORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("CORD_TOKEN"))?;

        let mut config = Self::new(token);

        if let Some(env) = lookup("APP_ENV") {
            config.env = Environment::parse(&env)
                .ok_or(ConfigError::InvalidValue("APP_ENV", env))?;
        }
        if let Some(url) = lookup("CORD_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }

        config.gateway_version =
            parse_var(&lookup, "CORD_GATEWAY_VERSION")?.unwrap_or_else(default_gateway_version);
        config.shard = parse_var(&lookup, "CORD_SHARD")?.unwrap_or(0);
        config.total_shards =
            parse_var(&lookup, "CORD_TOTAL_SHARDS")?.unwrap_or_else(default_total_shards);
        config.compress = parse_var(&lookup, "CORD_COMPRESS")?.unwrap_or(true);
        config.large_threshold =
            parse_var(&lookup, "CORD_LARGE_THRESHOLD")?.unwrap_or_else(default_large_threshold);
        config.reconnect = parse_var(&lookup, "CORD_RECONNECT")?.unwrap_or(true);
        config.message_cache_capacity = parse_var(&lookup, "CORD_MESSAGE_CACHE_CAPACITY")?
            .unwrap_or_else(default_message_cache_capacity);
        config.message_cache_storage = Duration::from_secs(
            parse_var(&lookup, "CORD_MESSAGE_CACHE_STORAGE_SECS")?
                .unwrap_or_else(default_message_cache_storage_secs),
        );
        config.message_sweep_interval = Duration::from_secs(
            parse_var(&lookup, "CORD_MESSAGE_SWEEP_INTERVAL_SECS")?
                .unwrap_or_else(default_message_sweep_interval_secs),
        );
        config.invalid_session_delay = Duration::from_millis(
            parse_var(&lookup, "CORD_INVALID_SESSION_DELAY_MS")?
                .unwrap_or_else(default_invalid_session_delay_ms),
        );
        config.hydration_poll_interval = Duration::from_millis(
            parse_var(&lookup, "CORD_HYDRATION_POLL_MS")?.unwrap_or_else(default_hydration_poll_ms),
        );
        config.hydration_stall_polls = parse_var(&lookup, "CORD_HYDRATION_STALL_POLLS")?
            .unwrap_or_else(default_hydration_stall_polls);
        config.hydration_chunk_quiet = Duration::from_millis(
            parse_var(&lookup, "CORD_HYDRATION_CHUNK_QUIET_MS")?
                .unwrap_or_else(default_hydration_chunk_quiet_ms),
        );

        if config.total_shards == 0 {
            return Err(ConfigError::InvalidValue("CORD_TOTAL_SHARDS", "0".to_string()));
        }
        if config.shard >= config.total_shards {
            return Err(ConfigError::InvalidValue(
                "CORD_SHARD",
                format!("{} (total shards: {})", config.shard, config.total_shards),
            ));
        }

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
