//! Classification of inbound messages.
//!
//! Every event gets a human-readable label (sender category, sender name,
//! message type) and a verdict on whether the configured audience includes
//! its sender. Nothing here fails: unknown kinds and missing names degrade
//! to generic labels.

use chrono::{DateTime, Local};
use keyreply_config::TargetScope;

use crate::event::{ChatEvent, SenderKind};
use crate::sink::{LineKind, StatusLine};

/// Label used when the chat client could not resolve the sender's name.
pub const UNKNOWN_SENDER: &str = "unknown sender";

/// The result of classifying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub sender_kind: SenderKind,
    /// Resolved sender name (nickname, else alias, else [`UNKNOWN_SENDER`]).
    pub sender: String,
    /// Label from the message-kind table.
    pub kind_label: &'static str,
    /// Whether the sender belongs to the configured audience.
    pub in_scope: bool,
}

impl Classification {
    /// Sender category as shown in status lines, e.g. `friend alice`.
    pub fn category(&self) -> String {
        match self.sender_kind {
            SenderKind::Friend => format!("friend {}", self.sender),
            SenderKind::Group => format!("group {}", self.sender),
            SenderKind::Other => "other".to_string(),
        }
    }

    /// Full label, e.g. `group bob => image message`.
    pub fn label(&self) -> String {
        format!("{} => {}", self.category(), self.kind_label)
    }

    pub fn status_line(&self, timestamp: DateTime<Local>) -> StatusLine {
        StatusLine::new(LineKind::Message, self.category(), self.kind_label).at(timestamp)
    }
}

/// Classify `event` against the audience `target`.
pub fn classify(event: &ChatEvent, target: TargetScope) -> Classification {
    Classification {
        sender_kind: event.sender_kind,
        sender: sender_name(event).to_string(),
        kind_label: event.kind.label(),
        in_scope: in_scope(event.sender_kind, target),
    }
}

/// Whether a sender of `kind` is part of the `target` audience.
/// `Other` senders never are.
pub fn in_scope(kind: SenderKind, target: TargetScope) -> bool {
    matches!(
        (kind, target),
        (SenderKind::Friend, TargetScope::All | TargetScope::Friend)
            | (SenderKind::Group, TargetScope::All | TargetScope::Group)
    )
}

fn sender_name(event: &ChatEvent) -> &str {
    [event.nickname.as_deref(), event.alias.as_deref()]
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_SENDER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MessageKind;

    #[test]
    fn test_scope_table() {
        use SenderKind::*;
        use TargetScope as T;

        assert!(in_scope(Friend, T::All));
        assert!(in_scope(Friend, T::Friend));
        assert!(!in_scope(Friend, T::Group));

        assert!(in_scope(Group, T::All));
        assert!(!in_scope(Group, T::Friend));
        assert!(in_scope(Group, T::Group));

        assert!(!in_scope(Other, T::All));
        assert!(!in_scope(Other, T::Friend));
        assert!(!in_scope(Other, T::Group));
    }

    #[test]
    fn test_friend_text_label() {
        let event = ChatEvent::text(SenderKind::Friend, "alice", "ping");
        let c = classify(&event, TargetScope::All);
        assert!(c.in_scope);
        assert_eq!(c.label(), "friend alice => text message");
    }

    #[test]
    fn test_group_media_label() {
        let event = ChatEvent::media(SenderKind::Group, "bob", MessageKind::IMAGE);
        let c = classify(&event, TargetScope::Friend);
        assert!(!c.in_scope);
        assert_eq!(c.label(), "group bob => image message");
    }

    #[test]
    fn test_other_sender_is_never_in_scope() {
        let event = ChatEvent::media(SenderKind::Other, "news", MessageKind::APP);
        let c = classify(&event, TargetScope::All);
        assert!(!c.in_scope);
        assert_eq!(c.label(), "other => app message");
    }

    #[test]
    fn test_unknown_kind_degrades() {
        let event = ChatEvent::media(SenderKind::Friend, "alice", MessageKind(777));
        let c = classify(&event, TargetScope::All);
        assert_eq!(c.kind_label, "unknown message");
    }

    #[test]
    fn test_missing_sender_degrades() {
        let mut event = ChatEvent::text(SenderKind::Group, "", "ping");
        let c = classify(&event, TargetScope::Group);
        assert_eq!(c.sender, UNKNOWN_SENDER);

        event.nickname = None;
        event.alias = Some("Boss".to_string());
        assert_eq!(classify(&event, TargetScope::Group).sender, "Boss");
    }

    #[test]
    fn test_status_line_uses_event_time() {
        use chrono::TimeZone;
        let ts = Local.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let event = ChatEvent::text(SenderKind::Friend, "alice", "ping").at(ts);
        let line = classify(&event, TargetScope::All).status_line(event.timestamp);
        assert_eq!(line.to_string(), "[2026-01-02 03:04:05] friend alice => text message");
        assert_eq!(line.kind, LineKind::Message);
    }
}
