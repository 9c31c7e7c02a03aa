#![deny(unsafe_code)]

//! keyreply core runtime.
//!
//! Classifies inbound chat messages, matches them against watched contacts
//! and keywords, throttles auto-replies, and publishes a bounded status feed.
//! The [`Daemon`] wires these together with a snapshot store and exposes an
//! IPC control plane for the CLI.

use std::future::Future;
use std::pin::Pin;

/// A type-erased, `Send`-safe, boxed future, the return type for async
/// trait methods used through `dyn Trait` ([`Messenger`], [`SnapshotStore`]).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Sender categories, message-kind labels and audience scoping.
pub mod classify;
/// Async daemon runtime.
pub mod daemon;
/// Classify → match → throttle → reply pipeline.
pub mod engine;
/// Inbound event types delivered by the chat client.
pub mod event;
/// Contact and keyword lookup sets.
pub mod index;
/// Unix socket control plane.
pub mod ipc;
/// Outbound reply contract.
pub mod messenger;
/// Bounded status-line feed.
pub mod sink;
/// Immutable committed configuration.
pub mod snapshot;
/// Persistence of settings and counters.
pub mod store;
/// Reply throttling.
pub mod throttle;

pub use classify::{Classification, classify};
pub use daemon::{Daemon, DaemonError, SessionStatus};
pub use engine::{Outcome, ReplyEngine};
pub use event::{ChatEvent, ClientEvent, MessageKind, ReplyTarget, SenderKind, SessionError};
pub use index::MatchIndex;
pub use messenger::{Messenger, SendError};
pub use sink::{EventSink, LineKind, StatusLine, Subscription};
pub use snapshot::{CommitError, Policy, Snapshot};
pub use store::{FileStore, MemoryStore, SnapshotStore, StoreError};
pub use throttle::{Decision, DecisionReason, ThrottleState};
