use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tracing::debug;

use crate::error::InstapayError;

use super::SnapshotStorage;

/// Keeps each key in its own `<key>.json` file inside a directory.
///
/// Writes go to a sibling temp file that is renamed over the target, so a reader never sees a
/// half-written snapshot.
#[derive(Debug, Clone)]
pub struct FileSnapshotStorage {
    dir: PathBuf,
}

impl FileSnapshotStorage {
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

fn unavailable(e: std::io::Error) -> InstapayError {
    InstapayError::StorageUnavailable(e.to_string())
}

#[async_trait(?Send)]
impl SnapshotStorage for FileSnapshotStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, InstapayError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable(e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), InstapayError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(unavailable)?;
        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{key}.json.tmp"));
        tokio::fs::write(&staging, value).await.map_err(unavailable)?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(unavailable)?;
        debug!("wrote snapshot {}", target.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), InstapayError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(unavailable(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use instapay_core::{amount::Amount, primitives::HistoryEntry};
    use pretty_assertions::assert_eq;

    use super::FileSnapshotStorage;
    use crate::localstore::{PaymentHistoryStore, PersistPolicy, SnapshotStorage, HISTORY_KEY};

    #[tokio::test]
    async fn test_missing_key() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = FileSnapshotStorage::with_dir(dir.path());
        assert_eq!(None, storage.get(HISTORY_KEY).await?);
        storage.remove(HISTORY_KEY).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_history_survives_restart() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let entry = HistoryEntry {
            id: "2024-05-01T10:20:30.000Z".to_owned(),
            amount: Amount::from_paise(99_999),
            date: "2024-05-01T10:20:30.000Z".to_owned(),
        };

        let mut store = PaymentHistoryStore::load(
            FileSnapshotStorage::with_dir(dir.path().join("nested")),
            PersistPolicy::Surface,
        )
        .await;
        store.record(entry.clone()).await?;

        let storage = FileSnapshotStorage::with_dir(dir.path().join("nested"));
        assert!(storage.path_for(HISTORY_KEY).exists());
        let mut fresh = PaymentHistoryStore::load(storage.clone(), PersistPolicy::Surface).await;
        assert_eq!(vec![entry], fresh.entries().to_vec());

        fresh.clear().await?;
        assert!(!storage.path_for(HISTORY_KEY).exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_corrupt_file_resets() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = FileSnapshotStorage::with_dir(dir.path());
        std::fs::write(storage.path_for(HISTORY_KEY), "{[}")?;
        let store = PaymentHistoryStore::load(storage.clone(), PersistPolicy::Surface).await;
        assert!(store.is_empty());
        assert!(!storage.path_for(HISTORY_KEY).exists());
        Ok(())
    }
}
