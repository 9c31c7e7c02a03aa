#![deny(unsafe_code)]

//! Configuration loading and validation for keyreply.
//!
//! A single TOML file carries the daemon settings, the reply policy (watched
//! contacts, trigger keywords, interval, audience, reply text) and the
//! throttle state persisted between runs. [`AppConfig`] is the central type;
//! [`ReplyConfig`] is the part that can be replaced at runtime.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daemon configuration.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Status event feed configuration.
    #[serde(default)]
    pub events: EventsConfig,

    /// Auto-reply policy, contacts and keywords.
    #[serde(default)]
    pub reply: ReplyConfig,

    /// Throttle state carried across restarts.
    #[serde(default)]
    pub throttle: ThrottleRecord,
}

/// Configuration for the daemon process.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Unix socket for the control plane. Falls back to the built-in
    /// default when unset.
    #[serde(default)]
    pub socket_path: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Status event feed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Maximum unread lines kept per subscriber before the oldest is dropped.
    #[serde(default = "default_events_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_events_capacity(),
        }
    }
}

fn default_events_capacity() -> usize {
    10
}

/// Which senders the bot answers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetScope {
    /// Friends and group members.
    All,
    /// Direct messages from friends only.
    Friend,
    /// Group members only.
    #[default]
    Group,
}

impl TargetScope {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetScope::All => "all",
            TargetScope::Friend => "friend",
            TargetScope::Group => "group",
        }
    }
}

impl fmt::Display for TargetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The replaceable part of the configuration: who to watch, what to
/// listen for, and how often to answer.
///
/// ## TOML Example
///
/// ```toml
/// [reply]
/// contacts = ["alice", "Team Lead"]
/// keywords = ["ping", "status?"]
/// interval = 2
/// target = "all"
/// tomorrow_reset = true
/// text = "I'm away, back soon."
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyConfig {
    /// Display names or aliases whose messages are watched. Order is kept
    /// for display only.
    #[serde(default)]
    pub contacts: Vec<String>,

    /// Message texts that trigger a reply (exact, case-sensitive).
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Reply to every `interval + 1`-th matched message. Signed so that a
    /// negative value in a file is caught by validation rather than by the
    /// parser.
    #[serde(default = "default_interval")]
    pub interval: i64,

    /// Audience the bot answers.
    #[serde(default)]
    pub target: TargetScope,

    /// Always answer the first matched message of a new calendar day.
    #[serde(default = "default_tomorrow_reset")]
    pub tomorrow_reset: bool,

    /// The auto-reply text.
    #[serde(default)]
    pub text: String,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            contacts: Vec::new(),
            keywords: Vec::new(),
            interval: default_interval(),
            target: TargetScope::default(),
            tomorrow_reset: default_tomorrow_reset(),
            text: String::new(),
        }
    }
}

fn default_interval() -> i64 {
    1
}

fn default_tomorrow_reset() -> bool {
    true
}

impl ReplyConfig {
    /// Validate the reply settings on their own (used when a new snapshot
    /// is committed at runtime).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval < 0 {
            return Err(ConfigError::Validation(format!(
                "reply.interval must be non-negative, got {}",
                self.interval
            )));
        }
        Ok(())
    }
}

/// Persisted throttle state: how many matched messages have been seen and
/// when the latest one arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrottleRecord {
    #[serde(default)]
    pub reply_count: u64,

    #[serde(default = "Local::now")]
    pub last_event_time: DateTime<Local>,
}

impl Default for ThrottleRecord {
    fn default() -> Self {
        Self {
            reply_count: 0,
            last_event_time: Local::now(),
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the configuration to `path`, replacing any previous content.
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let rendered = self.to_toml()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, rendered).await?;
        debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                VALID_LOG_LEVELS, self.logging.level
            )));
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::Validation(
                "events.capacity must be at least 1".to_string(),
            ));
        }
        if let Some(path) = &self.daemon.socket_path {
            if path.is_empty() {
                return Err(ConfigError::Validation(
                    "daemon.socket_path must not be empty when set".to_string(),
                ));
            }
        }
        self.reply.validate()
    }
}
