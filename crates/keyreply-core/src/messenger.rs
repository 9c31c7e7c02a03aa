//! The outbound half of the chat-client contract.

use crate::BoxFuture;
use crate::event::ReplyTarget;

/// Sends auto-replies through the chat client.
///
/// Delivery is a single attempt: the engine reports failures and moves on,
/// it never retries.
pub trait Messenger: Send + Sync {
    /// Deliver `text` to `target`.
    fn send_reply<'a>(
        &'a self,
        target: &'a ReplyTarget,
        text: &'a str,
    ) -> BoxFuture<'a, Result<(), SendError>>;
}

/// Errors from reply delivery.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("reply delivery failed: {0}")]
    Delivery(String),

    #[error("chat client is not connected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
