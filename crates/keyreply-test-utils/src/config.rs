//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use chrono::{DateTime, Local};
use keyreply_config::{AppConfig, ReplyConfig, TargetScope};

/// Fluent builder for [`AppConfig`] in tests.
///
/// Starts from a config that watches nobody; `interval` defaults to 0 so
/// every matched message replies unless a test says otherwise.
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .contacts(&["alice"])
///     .keywords(&["ping"])
///     .interval(2)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.reply.interval = 0;
        config.reply.target = TargetScope::All;
        config.reply.tomorrow_reset = false;
        config.reply.text = "auto reply".to_string();
        Self { config }
    }

    pub fn contacts(mut self, contacts: &[&str]) -> Self {
        self.config.reply.contacts = contacts.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.config.reply.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn interval(mut self, interval: i64) -> Self {
        self.config.reply.interval = interval;
        self
    }

    pub fn target(mut self, target: TargetScope) -> Self {
        self.config.reply.target = target;
        self
    }

    pub fn tomorrow_reset(mut self, enabled: bool) -> Self {
        self.config.reply.tomorrow_reset = enabled;
        self
    }

    pub fn reply_text(mut self, text: &str) -> Self {
        self.config.reply.text = text.to_string();
        self
    }

    pub fn reply_count(mut self, count: u64) -> Self {
        self.config.throttle.reply_count = count;
        self
    }

    pub fn last_event_time(mut self, at: DateTime<Local>) -> Self {
        self.config.throttle.last_event_time = at;
        self
    }

    pub fn events_capacity(mut self, capacity: usize) -> Self {
        self.config.events.capacity = capacity;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn socket_path(mut self, path: &str) -> Self {
        self.config.daemon.socket_path = Some(path.to_string());
        self
    }

    /// Just the `[reply]` section.
    pub fn build_reply(self) -> ReplyConfig {
        self.config.reply
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
