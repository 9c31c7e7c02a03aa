//! Inbound chat events as delivered by the chat client.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Who sent a message, as far as the chat client can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    /// A direct message from a friend.
    Friend,
    /// A message posted by a member of a group chat.
    Group,
    /// Anything else (official accounts, system notices, self).
    Other,
}

/// Numeric message-type code from the chat client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKind(pub u32);

impl MessageKind {
    pub const TEXT: Self = Self(1);
    pub const IMAGE: Self = Self(3);
    pub const VOICE: Self = Self(34);
    pub const VERIFY: Self = Self(37);
    pub const POSSIBLE_FRIEND: Self = Self(40);
    pub const CONTACT_CARD: Self = Self(42);
    pub const VIDEO: Self = Self(43);
    pub const STICKER: Self = Self(47);
    pub const LOCATION: Self = Self(48);
    pub const APP: Self = Self(49);
    pub const VOIP: Self = Self(50);
    pub const VOIP_NOTIFY: Self = Self(52);
    pub const VOIP_INVITE: Self = Self(53);
    pub const MICRO_VIDEO: Self = Self(62);
    pub const SYSTEM: Self = Self(10000);
    pub const RECALLED: Self = Self(10002);

    /// Human-readable label. Unknown codes map to a generic label.
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "text message",
            3 => "image message",
            34 => "voice message",
            37 => "friend verification",
            40 => "friend recommendation",
            42 => "contact card",
            43 => "video message",
            47 => "sticker",
            48 => "location",
            49 => "app message",
            50 => "VoIP message",
            52 => "VoIP ended",
            53 => "VoIP invite",
            62 => "short video",
            10000 => "system message",
            10002 => "message recalled",
            _ => "unknown message",
        }
    }
}

/// A message event handed to the engine by the chat client.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    /// Conversation the message arrived in; replies go back here.
    pub conversation: String,

    pub sender_kind: SenderKind,

    /// Sender display name. `None` when the client could not resolve it.
    pub nickname: Option<String>,

    /// Alias (remark name) the bot owner gave the sender, if any.
    pub alias: Option<String>,

    pub kind: MessageKind,

    /// Message body. Present only for text messages.
    pub text: Option<String>,

    pub timestamp: DateTime<Local>,
}

impl ChatEvent {
    /// Create a text message from `nickname`, timestamped now.
    pub fn text(sender_kind: SenderKind, nickname: &str, body: &str) -> Self {
        Self {
            conversation: nickname.to_string(),
            sender_kind,
            nickname: Some(nickname.to_string()),
            alias: None,
            kind: MessageKind::TEXT,
            text: Some(body.to_string()),
            timestamp: Local::now(),
        }
    }

    /// Create a non-text message of the given kind from `nickname`.
    pub fn media(sender_kind: SenderKind, nickname: &str, kind: MessageKind) -> Self {
        Self {
            conversation: nickname.to_string(),
            sender_kind,
            nickname: Some(nickname.to_string()),
            alias: None,
            kind,
            text: None,
            timestamp: Local::now(),
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn with_conversation(mut self, conversation: &str) -> Self {
        self.conversation = conversation.to_string();
        self
    }

    pub fn at(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether this message carries text and is eligible for matching.
    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    /// Where a reply to this message should be delivered.
    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget {
            conversation: self.conversation.clone(),
            recipient: self
                .nickname
                .clone()
                .unwrap_or_else(|| self.conversation.clone()),
        }
    }
}

/// Destination of an auto-reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTarget {
    pub conversation: String,
    /// Display name used in status lines.
    pub recipient: String,
}

/// An error reported by the chat client about its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub message: String,
    /// Whether the client session is still running after the error.
    pub session_alive: bool,
}

impl SessionError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
            session_alive: true,
        }
    }

    pub fn fatal(message: &str) -> Self {
        Self {
            message: message.to_string(),
            session_alive: false,
        }
    }

    /// Whether the error says the session was invalidated elsewhere
    /// (e.g. the account logged in on another device).
    pub fn is_session_invalidated(&self) -> bool {
        self.message.contains(SESSION_INVALIDATED_MARKER)
    }
}

/// Substring the chat client uses when the login cookie stops being valid.
pub const SESSION_INVALIDATED_MARKER: &str = "cookie invalid";

/// Everything the chat client pushes into the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Message(ChatEvent),
    Error(SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_kind_labels() {
        assert_eq!(MessageKind::TEXT.label(), "text message");
        assert_eq!(MessageKind::IMAGE.label(), "image message");
        assert_eq!(MessageKind::RECALLED.label(), "message recalled");
        assert_eq!(MessageKind::SYSTEM.label(), "system message");
    }

    #[test]
    fn test_unknown_kind_is_generic() {
        assert_eq!(MessageKind(0).label(), "unknown message");
        assert_eq!(MessageKind(9999).label(), "unknown message");
    }

    #[test]
    fn test_text_event() {
        let event = ChatEvent::text(SenderKind::Friend, "alice", "ping");
        assert!(event.is_text());
        assert_eq!(event.kind, MessageKind::TEXT);
        assert_eq!(event.text.as_deref(), Some("ping"));
        assert_eq!(event.conversation, "alice");
    }

    #[test]
    fn test_media_event_has_no_text() {
        let event = ChatEvent::media(SenderKind::Group, "bob", MessageKind::IMAGE);
        assert!(!event.is_text());
    }

    #[test]
    fn test_reply_target_falls_back_to_conversation() {
        let mut event = ChatEvent::text(SenderKind::Group, "bob", "hi").with_conversation("room-1");
        assert_eq!(event.reply_target().recipient, "bob");
        event.nickname = None;
        let target = event.reply_target();
        assert_eq!(target.conversation, "room-1");
        assert_eq!(target.recipient, "room-1");
    }

    #[test]
    fn test_session_invalidated_detection() {
        assert!(SessionError::new("sync failed: cookie invalid").is_session_invalidated());
        assert!(!SessionError::new("timeout").is_session_invalidated());
        assert!(!SessionError::fatal("timeout").session_alive);
    }

    #[test]
    fn test_sender_kind_serde() {
        let kind: SenderKind = serde_json::from_str("\"group\"").unwrap();
        assert_eq!(kind, SenderKind::Group);
    }
}
