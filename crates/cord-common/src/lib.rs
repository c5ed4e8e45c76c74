//! # cord-common
//!
//! Shared utilities: configuration loading and telemetry.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{ClientConfig, ConfigError, Environment};
pub use telemetry::{try_init_tracing_with_config, TracingConfig, TracingError};
