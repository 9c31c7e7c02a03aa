//! Immutable configuration snapshots.
//!
//! A [`Snapshot`] bundles the reply policy with the [`MatchIndex`] built
//! from the same lists, so a reader holding one `Arc<Snapshot>` always sees
//! a policy and an index that belong together.

use keyreply_config::{ConfigError, ReplyConfig, TargetScope};

use crate::index::MatchIndex;

/// Reply policy values derived from a [`ReplyConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub interval: u64,
    pub target: TargetScope,
    pub tomorrow_reset: bool,
    pub reply_text: String,
}

impl Policy {
    /// `interval + 1`, the cycle length of the counter rule.
    pub fn divisor(&self) -> u64 {
        self.interval.saturating_add(1)
    }
}

/// A committed configuration: policy, match index and the source settings
/// they were built from.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Monotonic commit number, starting at 1 for the boot snapshot.
    pub version: u64,
    pub policy: Policy,
    pub index: MatchIndex,
    source: ReplyConfig,
}

impl Snapshot {
    /// Validate `config` and build a snapshot from it.
    pub fn build(config: &ReplyConfig, version: u64) -> Result<Self, CommitError> {
        config.validate()?;
        let interval = u64::try_from(config.interval).map_err(|_| {
            ConfigError::Validation(format!(
                "reply.interval must be non-negative, got {}",
                config.interval
            ))
        })?;

        Ok(Self {
            version,
            policy: Policy {
                interval,
                target: config.target,
                tomorrow_reset: config.tomorrow_reset,
                reply_text: config.text.clone(),
            },
            index: MatchIndex::rebuild(&config.contacts, &config.keywords),
            source: config.clone(),
        })
    }

    /// The settings this snapshot was built from, in their original order.
    pub fn source(&self) -> &ReplyConfig {
        &self.source
    }
}

/// A configuration commit was refused; the previous snapshot stays active.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("snapshot rejected: {0}")]
    Invalid(#[from] ConfigError),
}
