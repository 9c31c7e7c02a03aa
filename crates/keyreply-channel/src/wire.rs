//! Wire formats for the JSON-lines channel.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use keyreply_core::{ChatEvent, ClientEvent, MessageKind, ReplyTarget, SenderKind, SessionError};

use crate::ChannelError;

/// One inbound line from the chat client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundLine {
    Message(MessageLine),
    Error(ErrorLine),
}

/// A received chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLine {
    pub conversation: String,
    pub sender_kind: SenderKind,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default = "text_kind")]
    pub kind: MessageKind,
    #[serde(default)]
    pub text: Option<String>,
    /// Receipt time is used when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Local>>,
}

fn text_kind() -> MessageKind {
    MessageKind::TEXT
}

/// An error reported by the chat client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLine {
    pub message: String,
    /// Whether the client session survived the error.
    #[serde(default = "alive_default")]
    pub alive: bool,
}

fn alive_default() -> bool {
    true
}

impl From<MessageLine> for ChatEvent {
    fn from(line: MessageLine) -> Self {
        // Text is carried only by text-kind messages, and always by them.
        let text = if line.kind == MessageKind::TEXT {
            Some(line.text.unwrap_or_default())
        } else {
            None
        };
        ChatEvent {
            conversation: line.conversation,
            sender_kind: line.sender_kind,
            nickname: line.nickname,
            alias: line.alias,
            kind: line.kind,
            text,
            timestamp: line.timestamp.unwrap_or_else(Local::now),
        }
    }
}

impl From<InboundLine> for ClientEvent {
    fn from(line: InboundLine) -> Self {
        match line {
            InboundLine::Message(message) => ClientEvent::Message(message.into()),
            InboundLine::Error(error) => ClientEvent::Error(SessionError {
                message: error.message,
                session_alive: error.alive,
            }),
        }
    }
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ClientEvent>, ChannelError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let inbound: InboundLine = serde_json::from_str(line)?;
    Ok(Some(inbound.into()))
}

/// One outbound reply line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "reply")]
pub struct OutboundReply {
    pub conversation: String,
    pub text: String,
}

impl OutboundReply {
    pub fn new(target: &ReplyTarget, text: &str) -> Self {
        Self {
            conversation: target.conversation.clone(),
            text: text.to_string(),
        }
    }

    /// Render as a single JSON line including the trailing newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_message() {
        let line = r#"{"type":"message","conversation":"room-1","sender_kind":"group",
            "nickname":"alice","alias":"Team Lead","kind":1,"text":"ping",
            "timestamp":"2026-10-19T09:30:00+00:00"}"#
            .replace('\n', "");
        let Some(ClientEvent::Message(event)) = parse_line(&line).unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(event.conversation, "room-1");
        assert_eq!(event.sender_kind, SenderKind::Group);
        assert_eq!(event.nickname.as_deref(), Some("alice"));
        assert_eq!(event.alias.as_deref(), Some("Team Lead"));
        assert_eq!(event.text.as_deref(), Some("ping"));
        let expected = chrono::Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
        assert_eq!(event.timestamp, expected);
    }

    #[test]
    fn test_parse_media_drops_text() {
        let line = r#"{"type":"message","conversation":"bob","sender_kind":"friend","nickname":"bob","kind":3,"text":"<img>"}"#;
        let Some(ClientEvent::Message(event)) = parse_line(line).unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(event.kind, MessageKind::IMAGE);
        assert!(event.text.is_none());
    }

    #[test]
    fn test_parse_minimal_message_defaults_to_text() {
        let line = r#"{"type":"message","conversation":"c","sender_kind":"other"}"#;
        let Some(ClientEvent::Message(event)) = parse_line(line).unwrap() else {
            panic!("expected a message");
        };
        assert_eq!(event.kind, MessageKind::TEXT);
        assert_eq!(event.text.as_deref(), Some(""));
        assert!(event.nickname.is_none());
    }

    #[test]
    fn test_parse_error_line() {
        let line = r#"{"type":"error","message":"login: cookie invalid","alive":false}"#;
        let Some(ClientEvent::Error(error)) = parse_line(line).unwrap() else {
            panic!("expected an error");
        };
        assert!(!error.session_alive);
        assert!(error.is_session_invalidated());

        let line = r#"{"type":"error","message":"timeout"}"#;
        let Some(ClientEvent::Error(error)) = parse_line(line).unwrap() else {
            panic!("expected an error");
        };
        assert!(error.session_alive);
    }

    #[test]
    fn test_blank_and_malformed_lines() {
        assert!(parse_line("   ").unwrap().is_none());
        assert!(matches!(parse_line("{not json"), Err(ChannelError::Parse(_))));
        assert!(matches!(
            parse_line(r#"{"type":"presence","who":"alice"}"#),
            Err(ChannelError::Parse(_))
        ));
    }

    #[test]
    fn test_outbound_line_format() {
        let target = ReplyTarget {
            conversation: "room-1".to_string(),
            recipient: "alice".to_string(),
        };
        let line = OutboundReply::new(&target, "away").to_line().unwrap();
        assert_eq!(line, "{\"type\":\"reply\",\"conversation\":\"room-1\",\"text\":\"away\"}\n");
    }
}
