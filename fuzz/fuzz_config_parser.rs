//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Anything that parses must also survive a render/parse cycle and build a
//! reply snapshot.

#![no_main]

use keyreply_config::AppConfig;
use keyreply_core::Snapshot;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = AppConfig::parse(s) else {
        return;
    };

    assert!(Snapshot::build(&config.reply, 1).is_ok());
    if let Ok(rendered) = config.to_toml() {
        let reparsed = AppConfig::parse(&rendered).expect("rendered config must parse");
        assert_eq!(reparsed.reply, config.reply);
    }
});
