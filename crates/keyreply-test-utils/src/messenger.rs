//! In-memory [`Messenger`] for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use keyreply_core::{BoxFuture, Messenger, ReplyTarget, SendError};

/// One captured reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReply {
    pub target: ReplyTarget,
    pub text: String,
}

/// Records every reply instead of delivering it. Can be switched to fail,
/// in which case attempts are counted but nothing is recorded.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<SentReply>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies delivered so far, in order.
    pub fn sent(&self) -> Vec<SentReply> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Delivery attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl Messenger for RecordingMessenger {
    fn send_reply<'a>(
        &'a self,
        target: &'a ReplyTarget,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), SendError>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(SendError::Delivery("test messenger is failing".to_string()));
            }
            self.sent.lock().unwrap().push(SentReply {
                target: target.clone(),
                text: text.to_string(),
            });
            Ok(())
        })
    }
}
