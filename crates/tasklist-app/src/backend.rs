//! Construction of the configured storage provider.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tasklist_store::{FileKeyValueStore, InMemoryCollection, LocalSnapshotProvider, RealtimeProvider, StorageProvider};
use tracing::info;

use crate::config::{Backend, StorageConfig};

/// Provider chosen at runtime.
pub type DynProvider = Box<dyn StorageProvider + Send>;

/// Open the provider described by `config`.
///
/// `fallback_dir` is used for the local snapshot when the configuration names
/// no directory. The memory backend must be opened inside a tokio runtime.
pub fn open_provider(config: &StorageConfig, fallback_dir: &Path) -> Result<DynProvider> {
    match config.backend {
        Backend::Local => {
            let dir = snapshot_dir(config, fallback_dir);
            let kv = FileKeyValueStore::open(&dir)
                .with_context(|| format!("failed to open data directory {}", dir.display()))?;
            info!(dir = %dir.display(), key = %config.key, "Opened local snapshot");
            Ok(Box::new(LocalSnapshotProvider::open(kv, config.key.clone())))
        }
        Backend::Memory => {
            let collection = InMemoryCollection::new(config.collection.clone());
            let provider = RealtimeProvider::new(collection).context("memory backend requires a tokio runtime")?;
            info!(collection = %config.collection, "Attached to in-memory collection");
            Ok(Box::new(provider))
        }
    }
}

fn snapshot_dir(config: &StorageConfig, fallback_dir: &Path) -> PathBuf {
    config
        .dir
        .clone()
        .unwrap_or_else(|| fallback_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use tasklist_store::SyncMode;
    use tempfile::tempdir;

    #[test]
    fn local_backend_uses_fallback_dir() -> Result<()> {
        let dir = tempdir()?;
        let provider = open_provider(&StorageConfig::default(), dir.path())?;
        assert_eq!(provider.sync_mode(), SyncMode::Snapshot);

        provider.create("Buy milk")?;
        assert!(dir.path().join("tasklist_tasks_v1.json").exists());
        Ok(())
    }

    #[test]
    fn configured_dir_wins_over_fallback() -> Result<()> {
        let configured = tempdir()?;
        let fallback = tempdir()?;
        let config = StorageConfig {
            dir: Some(configured.path().join("nested")),
            ..StorageConfig::default()
        };
        let provider = open_provider(&config, fallback.path())?;
        provider.create("Walk dog")?;

        assert!(configured.path().join("nested").is_dir());
        assert_eq!(std::fs::read_dir(fallback.path())?.count(), 0);
        Ok(())
    }

    #[test]
    fn memory_backend_needs_runtime() {
        let config = StorageConfig {
            backend: Backend::Memory,
            ..StorageConfig::default()
        };
        let Err(err) = open_provider(&config, Path::new(".")) else {
            panic!("memory backend outside a runtime should error");
        };
        assert!(err.to_string().contains("tokio runtime"));
    }

    #[tokio::test]
    async fn memory_backend_is_push_mode() -> Result<()> {
        let config = StorageConfig {
            backend: Backend::Memory,
            ..StorageConfig::default()
        };
        let provider = open_provider(&config, Path::new("."))?;
        assert_eq!(provider.sync_mode(), SyncMode::Push);
        Ok(())
    }
}
