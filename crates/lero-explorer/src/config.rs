//! # Exploration Configuration
//!
//! `LeroConfig` carries the two feature flags, the scoring-service address and the
//! per-query limits. Hosts usually fill it from their own settings mechanism through
//! serde; `from_env` covers embedders that configure through the environment.
//!
//! | field                  | default     | environment         |
//! |------------------------|-------------|---------------------|
//! | `enabled`              | `false`     | `LERO_ENABLE`       |
//! | `verbose`              | `false`     | `LERO_VERBOSE`      |
//! | `server_host`          | `localhost` | `LERO_SERVER_HOST`  |
//! | `server_port`          | `14567`     | `LERO_SERVER_PORT`  |
//! | `max_rounds`           | `1024`      | `LERO_MAX_ROUNDS`   |
//! | `cardinality_capacity` | `25000`     | -                   |
//! | `io_timeout_ms`        | none        | -                   |

use crate::explorer::MAX_ROUNDS;
use lero_core::cardinality::DEFAULT_CARDINALITY_CAPACITY;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LeroConfig {
    /// Replace the host's planning entry point with guided exploration.
    pub enabled: bool,
    /// Execute every candidate under instrumentation and send its measured time
    /// along with the plan. Expensive; meant for debugging and training data.
    pub verbose: bool,
    pub server_host: String,
    pub server_port: u16,
    /// Requested round cap. Values above `MAX_ROUNDS` are clamped.
    pub max_rounds: u32,
    /// Maximum join cardinalities recorded per query.
    pub cardinality_capacity: usize,
    /// Read/write timeout for scoring-service exchanges. `None` waits forever.
    pub io_timeout_ms: Option<u64>,
}

impl Default for LeroConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            verbose: false,
            server_host: "localhost".to_string(),
            server_port: 14567,
            max_rounds: MAX_ROUNDS,
            cardinality_capacity: DEFAULT_CARDINALITY_CAPACITY,
            io_timeout_ms: None,
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

impl LeroConfig {
    /// Defaults overlaid with the `LERO_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`, keyed by environment variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = lookup("LERO_ENABLE") {
            config.enabled = parse_flag("LERO_ENABLE", v)?;
        }
        if let Some(v) = lookup("LERO_VERBOSE") {
            config.verbose = parse_flag("LERO_VERBOSE", v)?;
        }
        if let Some(v) = lookup("LERO_SERVER_HOST") {
            config.server_host = v;
        }
        if let Some(v) = lookup("LERO_SERVER_PORT") {
            config.server_port = parse_number("LERO_SERVER_PORT", v)?;
        }
        if let Some(v) = lookup("LERO_MAX_ROUNDS") {
            config.max_rounds = parse_number("LERO_MAX_ROUNDS", v)?;
        }
        Ok(config)
    }

    /// The effective number of rounds: the requested cap, clamped to `1..=MAX_ROUNDS`.
    pub fn round_cap(&self) -> u32 {
        self.max_rounds.clamp(1, MAX_ROUNDS)
    }

    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_flag(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
