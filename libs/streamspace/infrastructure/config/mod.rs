//! Live dashboard configuration
//!
//! Loaded from YAML; `STREAMSPACE_HOST` overrides the server host and
//! `STREAMSPACE_TOKEN` supplies the initial auth token.

use crate::notifications::QueueSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use streamsockets::{
    CappedExponential, FeedEndpoint, FixedEscalation, LogTarget, ReconnectPolicy, Scheme,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Env var overriding `server.host`
pub const HOST_ENV: &str = "STREAMSPACE_HOST";
/// Env var holding the initial auth token
pub const TOKEN_ENV: &str = "STREAMSPACE_TOKEN";

/// Main live dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    /// Pod to tail on startup
    #[serde(default)]
    pub logs: Option<LogsConfig>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// host[:port]
    pub host: String,
    /// https/wss when true
    #[serde(default = "default_true")]
    pub secure: bool,
    /// Seed the sessions tracker over REST before the first push
    #[serde(default)]
    pub seed_from_rest: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    FixedEscalation,
    CappedExponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_policy")]
    pub policy: PolicyKind,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_display_ms")]
    pub display_ms: u64,
    #[serde(default = "default_error_display_ms")]
    pub error_display_ms: u64,
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Forget a session after this many consecutive snapshots without it
    #[serde(default)]
    pub evict_after_missing: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsConfig {
    pub namespace: String,
    pub pod: String,
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_policy() -> PolicyKind {
    PolicyKind::CappedExponential
}

fn default_base_delay_ms() -> u64 {
    3_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    streamsockets::DEFAULT_MAX_ATTEMPTS
}

fn default_display_ms() -> u64 {
    5_000
}

fn default_error_display_ms() -> u64 {
    10_000
}

fn default_max_visible() -> usize {
    5
}

fn default_log_capacity() -> usize {
    crate::feeds::DEFAULT_LOG_CAPACITY
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReconnectConfig {
    /// Build the configured backoff policy
    pub fn build_policy(&self) -> Box<dyn ReconnectPolicy> {
        match self.policy {
            PolicyKind::FixedEscalation => Box::new(FixedEscalation),
            PolicyKind::CappedExponential => Box::new(CappedExponential::new(
                Duration::from_millis(self.base_delay_ms),
                Duration::from_millis(self.max_delay_ms),
            )),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            display_ms: default_display_ms(),
            error_display_ms: default_error_display_ms(),
            max_visible: default_max_visible(),
        }
    }
}

impl NotificationConfig {
    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            display: Duration::from_millis(self.display_ms),
            error_display: Duration::from_millis(self.error_display_ms),
            max_visible: self.max_visible,
        }
    }
}

impl LogsConfig {
    pub fn target(&self) -> LogTarget {
        LogTarget::new(self.namespace.clone(), self.pod.clone())
    }
}

impl LiveConfig {
    /// Load configuration from a YAML file, apply env overrides, validate
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config = Self::from_yaml(&yaml_content)?;

        if let Ok(host) = std::env::var(HOST_ENV) {
            if !host.trim().is_empty() {
                config.server.host = host.trim().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse without env overrides
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: LiveConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Initial auth token from the environment, if any
    pub fn token_from_env() -> Option<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn endpoint(&self) -> FeedEndpoint {
        let scheme = if self.server.secure { Scheme::Wss } else { Scheme::Ws };
        FeedEndpoint::new(scheme, self.server.host.clone())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.host must not be empty".to_string(),
            ));
        }

        if self.server.host.contains("://") || self.server.host.contains('/') {
            return Err(ConfigError::ValidationError(
                "server.host must be host[:port] without scheme or path".to_string(),
            ));
        }

        if self.reconnect.base_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "reconnect.base_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.reconnect.max_delay_ms < self.reconnect.base_delay_ms {
            return Err(ConfigError::ValidationError(
                "reconnect.max_delay_ms must be >= base_delay_ms".to_string(),
            ));
        }

        if self.reconnect.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "reconnect.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.notifications.error_display_ms < self.notifications.display_ms {
            return Err(ConfigError::ValidationError(
                "notifications.error_display_ms must be >= display_ms".to_string(),
            ));
        }

        if self.notifications.max_visible == 0 {
            return Err(ConfigError::ValidationError(
                "notifications.max_visible must be greater than 0".to_string(),
            ));
        }

        if let Some(logs) = &self.logs {
            if logs.namespace.is_empty() || logs.pod.is_empty() {
                return Err(ConfigError::ValidationError(
                    "logs.namespace and logs.pod must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
