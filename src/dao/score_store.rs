use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tracing::warn;

use crate::dao::{
    models::ScoreLedger,
    storage::{StorageError, StorageResult},
};

/// Abstraction over where the score ledger lives.
pub trait ScoreStore: Send + Sync {
    /// Load the ledger. Missing or unreadable data yields an empty ledger.
    fn load(&self) -> BoxFuture<'static, ScoreLedger>;
    /// Replace the persisted ledger with `ledger`.
    fn save(&self, ledger: ScoreLedger) -> BoxFuture<'static, StorageResult<()>>;
}

/// Ledger stored as a single JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileScoreStore {
    path: Arc<Path>,
}

impl JsonFileScoreStore {
    /// Store backed by the file at `path`; the file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::from(path.into()),
        }
    }

    /// Location of the score file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreStore for JsonFileScoreStore {
    fn load(&self) -> BoxFuture<'static, ScoreLedger> {
        let path = self.path.clone();
        Box::pin(async move {
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(err) if err.kind() == ErrorKind::NotFound => return ScoreLedger::new(),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to read score file; using empty ledger");
                    return ScoreLedger::new();
                }
            };

            match serde_json::from_str::<ScoreLedger>(&contents) {
                Ok(ledger) => ledger,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "score file is malformed; using empty ledger");
                    ScoreLedger::new()
                }
            }
        })
    }

    fn save(&self, ledger: ScoreLedger) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        Box::pin(async move {
            let payload = serde_json::to_vec_pretty(&ledger).map_err(StorageError::Encode)?;

            // Write next to the target then rename so readers never observe a torn file.
            let staging = staging_path(&path);
            tokio::fs::write(&staging, payload)
                .await
                .map_err(|source| StorageError::Write {
                    path: staging.clone(),
                    source,
                })?;
            tokio::fs::rename(&staging, &path)
                .await
                .map_err(|source| StorageError::Write {
                    path: path.to_path_buf(),
                    source,
                })
        })
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "scores.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::UserId;

    #[tokio::test]
    async fn missing_file_loads_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileScoreStore::new(dir.path().join("scores.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_file_loads_empty_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileScoreStore::new(&path);
        assert!(store.load().await.is_empty());
        // Corruption is left in place until the next successful write.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn negative_counts_are_treated_as_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        std::fs::write(&path, r#"{"1": -3}"#).unwrap();

        assert!(JsonFileScoreStore::new(&path).load().await.is_empty());
    }

    #[tokio::test]
    async fn saved_ledger_is_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileScoreStore::new(dir.path().join("scores.json"));

        let mut ledger = store.load().await;
        ledger.record_win(UserId(42));
        store.save(ledger).await.unwrap();

        let reloaded = store.load().await;
        assert_eq!(reloaded.wins(UserId(42)), 1);
        assert!(!dir.path().join("scores.json.tmp").exists());
    }
}
