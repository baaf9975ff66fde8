//! Bridge configuration.
//!
//! The two plane ports and the timeout classes are injected into the bridge
//! client at construction. Values come from (in increasing precedence) serde
//! defaults, an optional YAML file named by `APPMODEL_BRIDGE_CONFIG`, and
//! individual environment variables.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use appmodel_types::Plane;

pub const ENV_CONFIG_PATH: &str = "APPMODEL_BRIDGE_CONFIG";
pub const ENV_HOST: &str = "APPMODEL_BRIDGE_HOST";
pub const ENV_DATA_PORT: &str = "APPMODEL_DATA_PORT";
pub const ENV_COMMAND_PORT: &str = "APPMODEL_COMMAND_PORT";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_DATA_PORT: u16 = 3001;
pub const DEFAULT_COMMAND_PORT: u16 = 3002;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },
}

/// Timeout bucket for one bridge exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutClass {
    /// Login probe before auth-flagged tools.
    AuthProbe,
    /// Single-entity mutations and host commands.
    Mutation,
    /// Snapshot and listing fetches.
    Fetch,
    /// File-transfer-class operations (save).
    Bulk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_auth_probe_ms")]
    pub auth_probe_ms: u64,
    #[serde(default = "default_mutation_ms")]
    pub mutation_ms: u64,
    #[serde(default = "default_fetch_ms")]
    pub fetch_ms: u64,
    #[serde(default = "default_bulk_ms")]
    pub bulk_ms: u64,
}

fn default_auth_probe_ms() -> u64 {
    2_000
}

fn default_mutation_ms() -> u64 {
    5_000
}

fn default_fetch_ms() -> u64 {
    30_000
}

fn default_bulk_ms() -> u64 {
    120_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            auth_probe_ms: default_auth_probe_ms(),
            mutation_ms: default_mutation_ms(),
            fetch_ms: default_fetch_ms(),
            bulk_ms: default_bulk_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn millis(&self, class: TimeoutClass) -> u64 {
        match class {
            TimeoutClass::AuthProbe => self.auth_probe_ms,
            TimeoutClass::Mutation => self.mutation_ms,
            TimeoutClass::Fetch => self.fetch_ms,
            TimeoutClass::Bulk => self.bulk_ms,
        }
    }

    pub fn duration(&self, class: TimeoutClass) -> Duration {
        Duration::from_millis(self.millis(class))
    }
}

/// Where the host listens and how long each exchange may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_data_port")]
    pub data_port: u16,
    #[serde(default = "default_command_port")]
    pub command_port: u16,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_data_port() -> u16 {
    DEFAULT_DATA_PORT
}

fn default_command_port() -> u16 {
    DEFAULT_COMMAND_PORT
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            data_port: DEFAULT_DATA_PORT,
            command_port: DEFAULT_COMMAND_PORT,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Load from `.env`, the optional YAML file and environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let base = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) => {
                tracing::info!(path = %path, "Loading bridge configuration");
                Self::from_file(&path)?
            }
            Err(_) => Self::default(),
        };
        base.with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply host/port overrides from a variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_DATA_PORT) {
            self.data_port = parse_port(ENV_DATA_PORT, port)?;
        }
        if let Some(port) = lookup(ENV_COMMAND_PORT) {
            self.command_port = parse_port(ENV_COMMAND_PORT, port)?;
        }
        Ok(self)
    }

    pub fn port(&self, plane: Plane) -> u16 {
        match plane {
            Plane::Data => self.data_port,
            Plane::Command => self.command_port,
        }
    }

    pub fn base_url(&self, plane: Plane) -> String {
        format!("http://{}:{}", self.host, self.port(plane))
    }
}

fn parse_port(var: &'static str, value: String) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}
