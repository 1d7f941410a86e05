//! File persistent storage
//!
//! Persists the cluster state as JSON on shutdown; bring-up restores it

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::metadata::ClusterState;

/// Storage error
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// File storage
pub struct FileStorage {
    data_dir: PathBuf,
    state_path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        let state_path = data_dir.join("cluster_state.json");
        Self {
            data_dir,
            state_path,
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Ensure data directory exists
    pub async fn ensure_dir(&self) -> Result<(), StorageError> {
        if !fs::try_exists(&self.data_dir).await? {
            fs::create_dir_all(&self.data_dir).await?;
            info!("Created data directory: {:?}", self.data_dir);
        }
        Ok(())
    }

    /// Load persisted cluster state, if any
    pub async fn load(&self) -> Result<Option<ClusterState>, StorageError> {
        if !fs::try_exists(&self.state_path).await? {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.state_path).await?;
        let state: ClusterState = serde_json::from_str(&content)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        info!(
            "Loaded cluster state: {} collections, version {}",
            state.collections.len(),
            state.version
        );
        Ok(Some(state))
    }

    /// Save cluster state
    pub async fn save(&self, state: &ClusterState) -> Result<(), StorageError> {
        self.ensure_dir().await?;

        // Write to temp file first, then atomically rename
        let temp_path = self.state_path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.state_path).await?;

        info!("Saved cluster state: version {}", state.version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ClusterEvent;

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("pilot"));
        assert!(storage.load().await.unwrap().is_none());

        let mut state = ClusterState::new();
        state.apply(ClusterEvent::NodeJoined("127.0.0.1:8983_search".into()));
        storage.save(&state).await.unwrap();

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert!(loaded.is_live("127.0.0.1:8983_search"));
    }

    #[tokio::test]
    async fn test_corrupt_state_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        std::fs::write(storage.state_path(), "{ not json").unwrap();
        assert!(matches!(
            storage.load().await,
            Err(StorageError::Serialization(_))
        ));
    }
}
