#![deny(unsafe_code)]

//! Chat client adapter for keyreply.
//!
//! Bridges an external chat client to the daemon over newline-delimited
//! JSON. Each inbound line is a message or an error report and becomes a
//! [`ClientEvent`](keyreply_core::ClientEvent); each auto-reply goes out as
//! one JSON line on the writer side.
//!
//! ```text
//! {"type":"message","conversation":"room-1","sender_kind":"group","nickname":"alice","kind":1,"text":"ping"}
//! {"type":"error","message":"sync failed: cookie invalid","alive":false}
//! {"type":"reply","conversation":"room-1","text":"away for now"}
//! ```

/// Inbound pump and the line-writing messenger.
pub mod service;
/// JSON line formats.
pub mod wire;

pub use service::{LineMessenger, PumpStats, pump};
pub use wire::{ErrorLine, InboundLine, MessageLine, OutboundReply, parse_line};

/// Errors from the line channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed line: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("daemon event channel closed")]
    Closed,
}
