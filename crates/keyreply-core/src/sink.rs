//! Bounded status feed for UI and log subscribers.
//!
//! Each [`Subscription`] owns a queue of at most `capacity` unread lines.
//! [`EventSink::push`] never blocks: a full queue discards its oldest line
//! to make room. Every pushed line is also emitted as a `tracing` event on
//! the `keyreply::events` target so a log subscriber sees the same feed.
//! Closing the sink wakes every waiting subscriber.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of unread lines kept per subscriber.
pub const DEFAULT_CAPACITY: usize = 10;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What a status line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    /// An inbound message was classified.
    Message,
    /// An auto-reply was delivered.
    Reply,
    /// An auto-reply could not be delivered.
    ReplyFailed,
    /// The chat client reported an error.
    Error,
    /// The chat client session ended.
    BotStopped,
    /// The session was invalidated; login must be restarted.
    SessionInvalidated,
    /// A configuration snapshot was committed or rejected.
    Config,
    /// The snapshot store could not persist state.
    Store,
}

impl LineKind {
    fn is_problem(self) -> bool {
        matches!(
            self,
            LineKind::ReplyFailed
                | LineKind::Error
                | LineKind::BotStopped
                | LineKind::SessionInvalidated
                | LineKind::Store
        )
    }
}

/// A single human-readable status line: `[timestamp] category => detail`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusLine {
    pub timestamp: DateTime<Local>,
    pub kind: LineKind,
    pub category: String,
    pub detail: String,
}

impl StatusLine {
    /// Create a line stamped with the current time.
    pub fn new(kind: LineKind, category: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            category: category.into(),
            detail: detail.into(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} => {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.category,
            self.detail
        )
    }
}

/// Per-subscriber queue.
#[derive(Debug)]
struct Queue {
    state: Mutex<QueueState>,
    notify: Notify,
}

#[derive(Debug, Default)]
struct QueueState {
    lines: VecDeque<StatusLine>,
    dropped: u64,
}

impl Queue {
    fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                lines: VecDeque::with_capacity(capacity),
                dropped: 0,
            }),
            notify: Notify::new(),
        }
    }

    fn push(&self, line: StatusLine, capacity: usize) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.lines.len() >= capacity {
                state.lines.pop_front();
                state.dropped += 1;
            }
            state.lines.push_back(line);
        }
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<StatusLine> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .lines
            .pop_front()
    }
}

#[derive(Debug)]
struct SinkInner {
    capacity: usize,
    subscribers: Mutex<Vec<Weak<Queue>>>,
    closed: CancellationToken,
}

/// The status feed. Cheap to clone; all clones share the same subscribers.
#[derive(Debug, Clone)]
pub struct EventSink {
    inner: Arc<SinkInner>,
}

impl EventSink {
    /// Create a sink keeping at most `capacity` unread lines per subscriber.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                capacity: capacity.max(1),
                subscribers: Mutex::new(Vec::new()),
                closed: CancellationToken::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Register a new subscriber. Lines pushed before this call are not
    /// replayed.
    pub fn subscribe(&self) -> Subscription {
        let queue = Arc::new(Queue::new(self.inner.capacity));
        self.lock_subscribers().push(Arc::downgrade(&queue));
        Subscription {
            queue,
            closed: self.inner.closed.clone(),
        }
    }

    /// Publish a line to every live subscriber.
    ///
    /// Returns `false` if the sink has been closed and the line was discarded.
    pub fn push(&self, line: StatusLine) -> bool {
        if self.is_closed() {
            debug!(line = %line, "Event sink closed, dropping line");
            return false;
        }

        if line.kind.is_problem() {
            warn!(target: "keyreply::events", "{line}");
        } else {
            info!(target: "keyreply::events", "{line}");
        }

        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|weak| match weak.upgrade() {
            Some(queue) => {
                queue.push(line.clone(), self.inner.capacity);
                true
            }
            None => false,
        });
        true
    }

    /// Tear down the sink. Waiting subscribers are released once their
    /// queues are drained; later pushes are discarded.
    pub fn close(&self) {
        self.inner.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    /// Number of subscriptions still alive.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|weak| weak.strong_count() > 0);
        subscribers.len()
    }

    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<Weak<Queue>>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A subscriber's read handle. Dropping it unregisters the subscriber.
#[derive(Debug)]
pub struct Subscription {
    queue: Arc<Queue>,
    closed: CancellationToken,
}

impl Subscription {
    /// Wait for the next line. Returns `None` once the sink is closed and
    /// every pending line has been read.
    pub async fn recv(&mut self) -> Option<StatusLine> {
        loop {
            let notified = self.queue.notify.notified();
            if let Some(line) = self.queue.pop() {
                return Some(line);
            }
            if self.closed.is_cancelled() {
                return None;
            }
            tokio::select! {
                _ = notified => {}
                _ = self.closed.cancelled() => {}
            }
        }
    }

    /// Take the next pending line without waiting.
    pub fn try_recv(&mut self) -> Option<StatusLine> {
        self.queue.pop()
    }

    /// Number of unread lines.
    pub fn pending(&self) -> usize {
        self.queue
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .lines
            .len()
    }

    /// Number of lines discarded because this subscriber fell behind.
    pub fn dropped(&self) -> u64 {
        self.queue
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dropped
    }
}
