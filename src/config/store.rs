//! Shared, swappable configuration

use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use super::AppConfig;

/// Why [`ConfigStore::update`] left the current config in place
#[derive(Debug, Error)]
pub enum ConfigUpdateError {
    #[error("{0:#}")]
    Invalid(anyhow::Error),
    #[error("{0:#}")]
    Save(anyhow::Error),
}

/// Current configuration plus the file it persists to
pub struct ConfigStore {
    path: PathBuf,
    current: ArcSwap<AppConfig>,
    /// Serializes validate + write + swap across concurrent API updates
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, initial: AppConfig) -> Self {
        Self {
            path: path.into(),
            current: ArcSwap::from_pointee(initial),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> Arc<AppConfig> {
        self.current.load_full()
    }

    /// Swap in a config that is already on disk (hot reload); returns the previous one
    pub fn replace(&self, config: AppConfig) -> Arc<AppConfig> {
        self.current.swap(Arc::new(config))
    }

    /// Validate, persist, then swap in; returns the previous config
    ///
    /// Nothing changes if validation or the write fails.
    pub async fn update(&self, config: AppConfig) -> Result<Arc<AppConfig>, ConfigUpdateError> {
        config.validate().map_err(ConfigUpdateError::Invalid)?;

        let _guard = self.write_lock.lock().await;
        config.save(&self.path).await.map_err(ConfigUpdateError::Save)?;
        info!(
            "💾 Configuration saved to {} ({} bindings)",
            self.path.display(),
            config.bindings.len()
        );

        Ok(self.replace(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ActionKind, Binding};
    use anyhow::Result;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_update_persists_and_swaps() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.yaml");
        let store = ConfigStore::new(&path, AppConfig::default());

        let mut next = AppConfig::default();
        next.bindings
            .push(Binding::new(1, 7, true, ActionKind::SystemVolume));

        let previous = store.update(next.clone()).await?;

        assert!(previous.bindings.is_empty());
        assert_eq!(*store.current(), next);
        assert_eq!(AppConfig::load(&path).await?, next);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_update_changes_nothing() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.yaml");
        let store = ConfigStore::new(&path, AppConfig::default());

        let mut bad = AppConfig::default();
        bad.bindings
            .push(Binding::new(1, 1, false, ActionKind::ObsSwitchScene));

        assert!(matches!(
            store.update(bad).await,
            Err(ConfigUpdateError::Invalid(_))
        ));
        assert_eq!(*store.current(), AppConfig::default());
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_unwritable_path_is_a_save_error() -> Result<()> {
        let dir = TempDir::new()?;
        // A regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "")?;
        let store = ConfigStore::new(blocker.join("config.yaml"), AppConfig::default());

        let mut next = AppConfig::default();
        next.api.port = 6000;

        assert!(matches!(
            store.update(next).await,
            Err(ConfigUpdateError::Save(_))
        ));
        assert_eq!(store.current().api.port, 5000);
        Ok(())
    }

    #[test]
    fn test_replace_returns_previous() {
        let store = ConfigStore::new("unused.yaml", AppConfig::default());
        let mut next = AppConfig::default();
        next.api.port = 6000;

        let previous = store.replace(next);
        assert_eq!(previous.api.port, 5000);
        assert_eq!(store.current().api.port, 6000);
    }
}
