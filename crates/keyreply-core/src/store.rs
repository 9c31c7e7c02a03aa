//! Persistence of settings and throttle state between runs.
//!
//! A missing store is not an error: [`SnapshotStore::load`] returns
//! `Ok(None)` and the daemon boots from defaults.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicUsize, Ordering};

use keyreply_config::{AppConfig, ConfigError};

use crate::BoxFuture;

/// Loads the boot snapshot and persists committed ones.
pub trait SnapshotStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Read the stored configuration, or `None` if nothing was stored yet.
    fn load(&self) -> BoxFuture<'_, Result<Option<AppConfig>, StoreError>>;

    /// Replace the stored configuration.
    fn save<'a>(&'a self, config: &'a AppConfig) -> BoxFuture<'a, Result<(), StoreError>>;
}

/// Errors from a snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store config error: {0}")]
    Config(#[from] ConfigError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// TOML file store. The same file doubles as the daemon's config file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self) -> BoxFuture<'_, Result<Option<AppConfig>, StoreError>> {
        Box::pin(async move {
            let exists = tokio::fs::try_exists(&self.path)
                .await
                .map_err(ConfigError::from)?;
            if !exists {
                tracing::debug!(path = %self.path.display(), "No stored configuration");
                return Ok(None);
            }
            Ok(Some(AppConfig::load(&self.path).await?))
        })
    }

    fn save<'a>(&'a self, config: &'a AppConfig) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            config.save(&self.path).await?;
            Ok(())
        })
    }
}

/// In-memory store for tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    stored: Mutex<Option<AppConfig>>,
    saves: AtomicUsize,
    unavailable: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with `config`.
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            stored: Mutex::new(Some(config)),
            ..Self::default()
        }
    }

    /// The most recently saved configuration.
    pub fn stored(&self) -> Option<AppConfig> {
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every later load and save fail with `reason` (`None` restores
    /// normal behavior).
    pub fn set_unavailable(&self, reason: Option<&str>) {
        *self
            .unavailable
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = reason.map(str::to_string);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        match &*self
            .unavailable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
        {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn load(&self) -> BoxFuture<'_, Result<Option<AppConfig>, StoreError>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.stored())
        })
    }

    fn save<'a>(&'a self, config: &'a AppConfig) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            self.check_available()?;
            *self.stored.lock().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("absent.toml"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("keyreply.toml"));

        let mut config = AppConfig::default();
        config.reply.contacts = vec!["alice".to_string()];
        config.reply.interval = 4;
        config.throttle.reply_count = 17;
        store.save(&config).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.reply, config.reply);
        assert_eq!(loaded.throttle.reply_count, 17);
    }

    #[tokio::test]
    async fn test_file_store_invalid_content_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keyreply.toml");
        tokio::fs::write(&path, "[reply]\ninterval = -2\n").await.unwrap();

        let err = FileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Config(ConfigError::Validation(_))));
    }

    #[tokio::test]
    async fn test_memory_store_counts_saves() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_none());
        store.save(&AppConfig::default()).await.unwrap();
        store.save(&AppConfig::default()).await.unwrap();
        assert_eq!(store.save_count(), 2);
        assert!(store.load().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_store_unavailable() {
        let store = MemoryStore::with_config(AppConfig::default());
        store.set_unavailable(Some("disk full"));
        assert!(matches!(
            store.save(&AppConfig::default()).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.save_count(), 0);

        store.set_unavailable(None);
        assert!(store.load().await.unwrap().is_some());
    }
}
