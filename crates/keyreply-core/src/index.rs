//! Contact and keyword lookup sets.
//!
//! A [`MatchIndex`] is rebuilt from the configured lists on every commit and
//! never mutated afterwards. Matching is exact and case-sensitive on both
//! sides: the sender's nickname or alias must be a watched contact, and the
//! whole message text must equal a keyword.

use std::collections::HashSet;

use crate::event::ChatEvent;

/// Read-only lookup sets derived from the contact and keyword lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchIndex {
    contacts: HashSet<String>,
    keywords: HashSet<String>,
}

impl MatchIndex {
    /// Build the index from the configured lists. Duplicates collapse and
    /// blank entries (unfilled rows in an editor) are skipped.
    pub fn rebuild(contacts: &[String], keywords: &[String]) -> Self {
        Self {
            contacts: to_set(contacts),
            keywords: to_set(keywords),
        }
    }

    /// Whether a message from `nickname`/`alias` with body `text` is a trigger.
    pub fn matches(&self, nickname: Option<&str>, alias: Option<&str>, text: &str) -> bool {
        let known_sender = [nickname, alias]
            .into_iter()
            .flatten()
            .any(|name| self.contacts.contains(name));
        known_sender && self.keywords.contains(text)
    }

    /// Convenience wrapper over [`matches`](Self::matches) for a whole event.
    /// Non-text events never match.
    pub fn matches_event(&self, event: &ChatEvent) -> bool {
        match event.text.as_deref() {
            Some(text) => self.matches(event.nickname.as_deref(), event.alias.as_deref(), text),
            None => false,
        }
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}

fn to_set(items: &[String]) -> HashSet<String> {
    items
        .iter()
        .filter(|item| !item.is_empty())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{MessageKind, SenderKind};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn index() -> MatchIndex {
        MatchIndex::rebuild(&strings(&["alice", "Team Lead"]), &strings(&["ping", "status?"]))
    }

    #[test]
    fn test_nickname_and_keyword_match() {
        assert!(index().matches(Some("alice"), None, "ping"));
    }

    #[test]
    fn test_alias_matches_when_nickname_does_not() {
        assert!(index().matches(Some("a1ice_99"), Some("Team Lead"), "status?"));
    }

    #[test]
    fn test_unknown_sender_does_not_match() {
        assert!(!index().matches(Some("mallory"), None, "ping"));
        assert!(!index().matches(None, None, "ping"));
    }

    #[test]
    fn test_keyword_must_be_exact() {
        let idx = index();
        assert!(!idx.matches(Some("alice"), None, "ping please"));
        assert!(!idx.matches(Some("alice"), None, "pin"));
        assert!(!idx.matches(Some("alice"), None, "PING"));
        assert!(!idx.matches(Some("alice"), None, " ping"));
    }

    #[test]
    fn test_contact_is_case_sensitive() {
        assert!(!index().matches(Some("Alice"), None, "ping"));
    }

    #[test]
    fn test_duplicates_and_blanks_collapse() {
        let idx = MatchIndex::rebuild(&strings(&["alice", "alice", ""]), &strings(&["", "ping"]));
        assert_eq!(idx.contact_count(), 1);
        assert_eq!(idx.keyword_count(), 1);
        assert!(!idx.matches(Some(""), Some(""), ""));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let contacts = strings(&["alice", "bob"]);
        let keywords = strings(&["ping"]);
        assert_eq!(
            MatchIndex::rebuild(&contacts, &keywords),
            MatchIndex::rebuild(&contacts, &keywords)
        );
    }

    #[test]
    fn test_non_text_event_never_matches() {
        let event = ChatEvent::media(SenderKind::Friend, "alice", MessageKind::IMAGE);
        assert!(!index().matches_event(&event));
        let event = ChatEvent::text(SenderKind::Friend, "alice", "ping");
        assert!(index().matches_event(&event));
    }

    #[test]
    fn test_empty_index_matches_nothing() {
        assert!(!MatchIndex::default().matches(Some("alice"), None, "ping"));
    }
}
