//! Fuzz target for inbound client lines through classification and matching.
//!
//! Run with: cargo +nightly fuzz run fuzz_client_line
//!
//! Arbitrary lines must never panic the parser, and parsed messages must
//! classify and match without panicking for every audience.

#![no_main]

use keyreply_channel::parse_line;
use keyreply_config::TargetScope;
use keyreply_core::{ClientEvent, MatchIndex, classify};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(Some(ClientEvent::Message(event))) = parse_line(line) else {
        return;
    };

    let names: Vec<String> = event
        .nickname
        .iter()
        .chain(event.alias.iter())
        .cloned()
        .collect();
    let keywords: Vec<String> = event.text.iter().cloned().collect();
    let index = MatchIndex::rebuild(&names, &keywords);

    for target in [TargetScope::All, TargetScope::Friend, TargetScope::Group] {
        let c = classify(&event, target);
        assert!(!c.label().is_empty());
    }
    if event.text.as_deref().is_some_and(|t| !t.is_empty()) && !names.iter().all(String::is_empty) {
        assert!(index.matches_event(&event));
    }
});
