//! Daemon test helpers.
//!
//! Builds a [`Daemon`] backed by a [`FileStore`] in a temporary directory and
//! a [`RecordingMessenger`].

use std::path::PathBuf;
use std::sync::Arc;

use keyreply_config::AppConfig;
use keyreply_core::{Daemon, FileStore};
use tempfile::TempDir;

use crate::messenger::RecordingMessenger;

/// A test-scoped daemon with an owned temp directory for its store file.
///
/// The temp directory is deleted when this value is dropped, even on panic.
pub struct TestDaemon {
    pub daemon: Arc<Daemon>,
    pub messenger: Arc<RecordingMessenger>,
    pub config_path: PathBuf,
    temp_dir: TempDir,
}

impl TestDaemon {
    /// Store `config` in a temp file and bootstrap a daemon from it.
    pub async fn with_config(config: AppConfig) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("keyreply.toml");
        config
            .save(&config_path)
            .await
            .expect("failed to write test config");
        Self::boot(temp_dir, config_path).await
    }

    /// Write raw TOML to the store file and bootstrap a daemon from it.
    pub async fn with_toml(toml_content: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("keyreply.toml");
        tokio::fs::write(&config_path, toml_content)
            .await
            .expect("failed to write test config");
        Self::boot(temp_dir, config_path).await
    }

    /// A daemon whose store file does not exist yet.
    pub async fn empty() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let config_path = temp_dir.path().join("keyreply.toml");
        Self::boot(temp_dir, config_path).await
    }

    async fn boot(temp_dir: TempDir, config_path: PathBuf) -> Self {
        let messenger = Arc::new(RecordingMessenger::new());
        let store = Arc::new(FileStore::new(&config_path));
        let daemon = Daemon::bootstrap(store, messenger.clone())
            .await
            .expect("failed to bootstrap test daemon");
        Self {
            daemon: Arc::new(daemon),
            messenger,
            config_path,
            temp_dir,
        }
    }

    /// Read back what the store file currently holds.
    pub async fn stored_config(&self) -> AppConfig {
        AppConfig::load(&self.config_path)
            .await
            .expect("failed to read stored config")
    }

    /// A path inside the temp directory, e.g. for an IPC socket.
    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }
}
