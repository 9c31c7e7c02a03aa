//! Core daemon process: startup, event loop, configuration edits, shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use keyreply_config::{AppConfig, ReplyConfig};

use crate::engine::{Outcome, ReplyEngine};
use crate::event::{ChatEvent, ClientEvent, SessionError};
use crate::messenger::Messenger;
use crate::sink::{EventSink, LineKind, StatusLine, Subscription};
use crate::snapshot::CommitError;
use crate::store::{SnapshotStore, StoreError};
use crate::throttle::ThrottleState;

/// How a session error was surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Logged; the session continues.
    Reported,
    /// The chat client session ended.
    Stopped,
    /// The session was invalidated and login must be restarted.
    Invalidated,
}

/// The main keyreply daemon.
pub struct Daemon {
    settings: AppConfig,
    engine: ReplyEngine,
    store: Arc<dyn SnapshotStore>,
    persist_lock: tokio::sync::Mutex<()>,
    /// Held shared by every message and apply; `run` takes it exclusively
    /// to wait out in-flight work before the final persist.
    in_flight: tokio::sync::RwLock<()>,
    /// Set when the stored configuration exists but could not be read.
    /// Persisting is refused until an explicit apply.
    store_unreadable: AtomicBool,
    shutdown: CancellationToken,
    started_at: Instant,
}

impl Daemon {
    /// Create a daemon from `config`. Invalid reply settings are replaced
    /// by defaults with a warning; the rest of `config` is used as is.
    pub fn new(
        mut config: AppConfig,
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn SnapshotStore>,
    ) -> Result<Self, DaemonError> {
        if let Err(e) = config.reply.validate() {
            warn!(error = %e, "Invalid reply settings, starting from defaults");
            config.reply = ReplyConfig::default();
        }

        let sink = EventSink::new(config.events.capacity);
        let throttle = ThrottleState::from(&config.throttle);
        let engine = ReplyEngine::new(&config.reply, throttle, sink, messenger)?;

        Ok(Self {
            settings: config,
            engine,
            store,
            persist_lock: tokio::sync::Mutex::new(()),
            in_flight: tokio::sync::RwLock::new(()),
            store_unreadable: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            started_at: Instant::now(),
        })
    }

    /// Load the boot snapshot from `store` and create the daemon. A missing
    /// or unreadable store falls back to defaults.
    ///
    /// An unreadable store is left untouched: nothing is written back to it
    /// until new reply settings are applied.
    pub async fn bootstrap(
        store: Arc<dyn SnapshotStore>,
        messenger: Arc<dyn Messenger>,
    ) -> Result<Self, DaemonError> {
        let (config, unreadable) = match store.load().await {
            Ok(Some(config)) => {
                info!(store = store.name(), "Loaded stored configuration");
                (config, false)
            }
            Ok(None) => {
                info!(store = store.name(), "No stored configuration, using defaults");
                (AppConfig::default(), false)
            }
            Err(e) => {
                warn!(store = store.name(), error = %e, "Stored configuration unreadable, using defaults");
                (AppConfig::default(), true)
            }
        };
        let daemon = Self::new(config, messenger, store)?;
        if unreadable {
            daemon.store_unreadable.store(true, Ordering::SeqCst);
            daemon.engine.sink().push(StatusLine::new(
                LineKind::Store,
                "store",
                "stored configuration unreadable, running on defaults without saving",
            ));
        }
        Ok(daemon)
    }

    /// Process client events until the channel closes or shutdown is
    /// requested. Cancellation is checked between events. On exit, messages
    /// and applies already in flight are allowed to finish, then the current
    /// state is persisted (unless the store was unreadable at boot) and the
    /// event sink is closed.
    pub async fn run(&self, mut events: mpsc::Receiver<ClientEvent>) -> Result<(), DaemonError> {
        let snapshot = self.engine.snapshot();
        info!(
            target_scope = %snapshot.policy.target,
            interval = snapshot.policy.interval,
            contacts = snapshot.index.contact_count(),
            keywords = snapshot.index.keyword_count(),
            "keyreply daemon starting"
        );

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping daemon");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        if let Err(e) = self.dispatch(event).await {
                            warn!(error = %e, "Event dropped");
                        }
                    }
                    None => {
                        info!("Chat client closed the event stream");
                        break;
                    }
                },
            }
        }

        self.shutdown.cancel();
        let _drained = self.in_flight.write().await;
        let persisted = if self.store_unreadable.load(Ordering::SeqCst) {
            warn!(store = self.store.name(), "Not saving state over an unreadable stored configuration");
            Ok(())
        } else {
            self.persist().await
        };
        self.engine.sink().close();
        info!("Daemon stopped");
        persisted.map_err(DaemonError::from)
    }

    /// Route one client event. Safe to call concurrently; `run` waits for
    /// calls already past the shutdown check before its final persist.
    pub async fn dispatch(&self, event: ClientEvent) -> Result<(), DaemonError> {
        match event {
            ClientEvent::Message(event) => {
                self.handle_message(&event).await?;
            }
            ClientEvent::Error(error) => {
                self.report_session_error(&error);
            }
        }
        Ok(())
    }

    /// Run one inbound message through the engine.
    pub async fn handle_message(&self, event: &ChatEvent) -> Result<Outcome, DaemonError> {
        let _in_flight = self.in_flight.read().await;
        if self.is_shutting_down() {
            return Err(DaemonError::ShuttingDown);
        }
        let outcome = self.engine.handle_message(event).await;
        debug!(conversation = %event.conversation, ?outcome, "Message handled");
        Ok(outcome)
    }

    /// Surface a chat-client error on the event sink.
    pub fn report_session_error(&self, error: &SessionError) -> SessionStatus {
        let sink = self.engine.sink();
        sink.push(StatusLine::new(LineKind::Error, "error", &error.message));

        let mut status = SessionStatus::Reported;
        if !error.session_alive {
            sink.push(StatusLine::new(
                LineKind::BotStopped,
                "bot stopped",
                &error.message,
            ));
            status = SessionStatus::Stopped;
        }
        if error.is_session_invalidated() {
            sink.push(StatusLine::new(
                LineKind::SessionInvalidated,
                "session invalidated",
                &error.message,
            ));
            status = SessionStatus::Invalidated;
        }
        status
    }

    /// Commit new reply settings and persist them.
    ///
    /// A failed persist is reported on the sink but does not undo the
    /// commit; the returned version is live either way. A successful commit
    /// replaces a stored configuration that was unreadable at boot.
    pub async fn apply(&self, reply: ReplyConfig) -> Result<u64, DaemonError> {
        let _in_flight = self.in_flight.read().await;
        if self.is_shutting_down() {
            return Err(DaemonError::ShuttingDown);
        }
        let version = self.engine.commit(&reply)?;
        if self.store_unreadable.swap(false, Ordering::SeqCst) {
            info!(store = self.store.name(), version, "Replacing unreadable stored configuration");
        }
        if let Err(e) = self.persist().await {
            debug!(version, error = %e, "Committed snapshot not persisted");
        }
        Ok(version)
    }

    /// Save the live configuration and throttle state to the store.
    ///
    /// Refused with [`StoreError::Unavailable`] while the stored
    /// configuration is one that could not be read at boot.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;
        if self.store_unreadable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "stored configuration was unreadable at boot; apply new settings to replace it"
                    .to_string(),
            ));
        }
        let config = self.current_config();
        match self.store.save(&config).await {
            Ok(()) => {
                debug!(store = self.store.name(), "State persisted");
                Ok(())
            }
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "Failed to persist state");
                self.engine.sink().push(StatusLine::new(
                    LineKind::Store,
                    "store",
                    format!("persist failed: {e}"),
                ));
                Err(e)
            }
        }
    }

    /// The boot settings combined with the live reply snapshot and throttle
    /// state.
    pub fn current_config(&self) -> AppConfig {
        AppConfig {
            reply: self.engine.snapshot().source().clone(),
            throttle: self.engine.throttle_state().to_record(),
            ..self.settings.clone()
        }
    }

    /// Register a new status-line subscriber.
    pub fn subscribe(&self) -> Subscription {
        self.engine.sink().subscribe()
    }

    /// Request a graceful shutdown of the daemon.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// A token that fires when shutdown is requested.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn engine(&self) -> &ReplyEngine {
        &self.engine
    }

    /// The settings the daemon was started with.
    pub fn settings(&self) -> &AppConfig {
        &self.settings
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Errors from the daemon runtime.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("daemon is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
