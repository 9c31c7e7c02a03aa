#![deny(unsafe_code)]

//! Shared test utilities for the keyreply workspace.
//!
//! Provides config builders, a recording messenger, a temp-dir daemon and
//! tracing helpers so that individual crate tests stay concise and
//! consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! keyreply-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod daemon;
pub mod messenger;
pub mod tracing_setup;

pub use config::TestConfigBuilder;
pub use daemon::TestDaemon;
pub use messenger::RecordingMessenger;
pub use tracing_setup::init_test_tracing;
