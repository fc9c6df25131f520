//! Configuration loading, validation, and management for ctxbridge.
//!
//! Loads configuration from `~/.ctxbridge/config.toml` with environment
//! variable overrides. Validates all settings at startup so a bad policy
//! name or blocking mode fails before the server binds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ctxbridge_core::{BlockingMode, BridgeOptions, BridgePolicy, Context};

/// The root configuration structure.
///
/// Maps directly to `~/.ctxbridge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Bridge configuration
    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Whether blocking bridges may run: "allowed" or "forbidden"
    #[serde(default)]
    pub blocking: BlockingMode,

    /// Upper bound for every bridge call, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Policies exposed over HTTP. Unknown names fail validation.
    #[serde(default = "default_policies")]
    pub policies: Vec<String>,

    /// Context seeded by the `bridged-fabricated` policy
    #[serde(default = "default_fabricated")]
    pub fabricated: BTreeMap<String, String>,
}

fn default_timeout_ms() -> u64 {
    5000
}
fn default_policies() -> Vec<String> {
    BridgePolicy::ALL.iter().map(|p| p.to_string()).collect()
}
fn default_fabricated() -> BTreeMap<String, String> {
    BTreeMap::from([("key".to_string(), "otherValue".to_string())])
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            blocking: BlockingMode::default(),
            timeout_ms: default_timeout_ms(),
            policies: default_policies(),
            fabricated: default_fabricated(),
        }
    }
}

impl BridgeConfig {
    /// Parse the configured policy names.
    pub fn enabled_policies(&self) -> Result<Vec<BridgePolicy>, ConfigError> {
        self.policies
            .iter()
            .map(|name| {
                name.parse::<BridgePolicy>()
                    .map_err(|e| ConfigError::ValidationError(e.to_string()))
            })
            .collect()
    }

    /// Build the runtime options for a bridge.
    pub fn options(&self) -> BridgeOptions {
        BridgeOptions {
            blocking: self.blocking,
            timeout: Duration::from_millis(self.timeout_ms),
            fabricated: self
                .fabricated
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect::<Context>(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ctxbridge/config.toml).
    ///
    /// Environment overrides:
    /// - `CTXBRIDGE_PORT`
    /// - `CTXBRIDGE_BLOCKING` (`allowed` / `forbidden`)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = std::env::var("CTXBRIDGE_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("CTXBRIDGE_PORT is not a port: {port}"))
            })?;
        }

        if let Ok(mode) = std::env::var("CTXBRIDGE_BLOCKING") {
            self.bridge.blocking = mode.parse().map_err(ConfigError::ValidationError)?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ctxbridge")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bridge.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "bridge.timeout_ms must be greater than 0".into(),
            ));
        }

        if self.bridge.fabricated.is_empty() {
            return Err(ConfigError::ValidationError(
                "bridge.fabricated must hold at least one entry".into(),
            ));
        }

        self.bridge.enabled_policies()?;
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
