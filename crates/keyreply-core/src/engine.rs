//! The reply engine.
//!
//! [`ReplyEngine`] owns the committed configuration snapshot and the
//! throttle state. Message handling and configuration commits may run
//! concurrently from any number of tasks:
//!
//! - the snapshot sits behind `RwLock<Arc<Snapshot>>`; a handler clones the
//!   `Arc` once and uses that snapshot for the whole event, a commit swaps
//!   the pointer
//! - the throttle state sits behind a `Mutex`; one decision is one critical
//!   section, and the lock is released before the reply is sent

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use keyreply_config::ReplyConfig;
use tracing::{debug, info, warn};

use crate::classify::{Classification, classify};
use crate::event::ChatEvent;
use crate::messenger::Messenger;
use crate::sink::{EventSink, LineKind, StatusLine};
use crate::snapshot::{CommitError, Snapshot};
use crate::throttle::{Decision, ThrottleState};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Logged only: out of scope, not text, or not a trigger.
    Classified,
    /// A trigger, but the throttle suppressed the reply.
    Matched,
    /// A trigger, and the reply was delivered.
    Replied,
    /// A trigger, but delivering the reply failed.
    Failed(String),
}

impl Outcome {
    /// Whether the event reached the throttle.
    pub fn is_match(&self) -> bool {
        !matches!(self, Outcome::Classified)
    }
}

pub struct ReplyEngine {
    snapshot: RwLock<Arc<Snapshot>>,
    throttle: Mutex<ThrottleState>,
    sink: EventSink,
    messenger: Arc<dyn Messenger>,
}

impl ReplyEngine {
    /// Create an engine from the boot settings. The first snapshot is
    /// version 1.
    pub fn new(
        config: &ReplyConfig,
        throttle: ThrottleState,
        sink: EventSink,
        messenger: Arc<dyn Messenger>,
    ) -> Result<Self, CommitError> {
        let snapshot = Snapshot::build(config, 1)?;
        Ok(Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            throttle: Mutex::new(throttle),
            sink,
            messenger,
        })
    }

    /// The currently committed snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// A copy of the throttle state.
    pub fn throttle_state(&self) -> ThrottleState {
        *self.lock_throttle()
    }

    pub fn sink(&self) -> &EventSink {
        &self.sink
    }

    /// Atomically replace the active configuration.
    ///
    /// On success returns the new snapshot version. On failure the previous
    /// snapshot stays active. The throttle state is kept either way; a new
    /// interval or reset flag applies from the next matched message on.
    pub fn commit(&self, config: &ReplyConfig) -> Result<u64, CommitError> {
        let mut active = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let version = active.version + 1;

        match Snapshot::build(config, version) {
            Ok(next) => {
                info!(
                    version,
                    contacts = next.index.contact_count(),
                    keywords = next.index.keyword_count(),
                    interval = next.policy.interval,
                    target = %next.policy.target,
                    "Configuration committed"
                );
                *active = Arc::new(next);
                drop(active);
                self.sink.push(StatusLine::new(
                    LineKind::Config,
                    "config",
                    format!("committed version {version}"),
                ));
                Ok(version)
            }
            Err(e) => {
                drop(active);
                warn!(error = %e, "Configuration rejected");
                self.sink.push(StatusLine::new(
                    LineKind::Config,
                    "config",
                    format!("rejected: {e}"),
                ));
                Err(e)
            }
        }
    }

    /// Classify `event` against the active snapshot without side effects.
    pub fn classify(&self, event: &ChatEvent) -> Classification {
        classify(event, self.snapshot().policy.target)
    }

    /// Run one inbound message through classification, matching, the
    /// throttle and (maybe) reply delivery.
    pub async fn handle_message(&self, event: &ChatEvent) -> Outcome {
        let snapshot = self.snapshot();
        let classification = classify(event, snapshot.policy.target);
        self.sink.push(classification.status_line(event.timestamp));

        if !classification.in_scope {
            return Outcome::Classified;
        }
        let Some(text) = event.text.as_deref() else {
            return Outcome::Classified;
        };
        if !snapshot
            .index
            .matches(event.nickname.as_deref(), event.alias.as_deref(), text)
        {
            return Outcome::Classified;
        }

        let decision = self.decide(&snapshot, event);
        debug!(
            sender = %classification.sender,
            position = decision.position,
            reason = ?decision.reason,
            reply = decision.should_reply,
            "Matched message"
        );
        if !decision.should_reply {
            return Outcome::Matched;
        }

        let target = event.reply_target();
        match self
            .messenger
            .send_reply(&target, &snapshot.policy.reply_text)
            .await
        {
            Ok(()) => {
                self.sink.push(
                    StatusLine::new(
                        LineKind::Reply,
                        "reply",
                        format!("sent to {}", target.recipient),
                    )
                    .at(event.timestamp),
                );
                Outcome::Replied
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(recipient = %target.recipient, error = %reason, "Reply delivery failed");
                self.sink.push(
                    StatusLine::new(
                        LineKind::ReplyFailed,
                        "reply failed",
                        format!("{}: {reason}", target.recipient),
                    )
                    .at(event.timestamp),
                );
                Outcome::Failed(reason)
            }
        }
    }

    fn decide(&self, snapshot: &Snapshot, event: &ChatEvent) -> Decision {
        self.lock_throttle().decide(
            snapshot.policy.interval,
            snapshot.policy.tomorrow_reset,
            event.timestamp,
        )
    }

    fn lock_throttle(&self) -> std::sync::MutexGuard<'_, ThrottleState> {
        self.throttle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ReplyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyEngine")
            .field("snapshot_version", &self.snapshot().version)
            .field("throttle", &self.throttle_state())
            .finish_non_exhaustive()
    }
}
