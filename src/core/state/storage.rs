//! Checkpoint persistence

use super::checkpoint::JobCheckpoint;
use crate::domain::ids::JobId;
use crate::domain::{QuarryError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Storage backend for job checkpoints
#[async_trait]
pub trait CheckpointStorage: Send + Sync {
    /// Loads a checkpoint; `Ok(None)` when the job is unknown
    async fn load(&self, job_id: &JobId) -> Result<Option<JobCheckpoint>>;

    /// Creates or replaces a checkpoint
    async fn save(&self, checkpoint: &JobCheckpoint) -> Result<()>;

    /// All stored checkpoints, oldest first
    async fn list(&self) -> Result<Vec<JobCheckpoint>>;

    async fn delete(&self, job_id: &JobId) -> Result<()>;
}

/// Stores each checkpoint as `<dir>/<job_id>.json`
///
/// Writes go to a temporary file that is renamed into place, so a crash
/// never leaves a half-written checkpoint behind.
#[derive(Debug, Clone)]
pub struct FileCheckpointStorage {
    dir: PathBuf,
}

impl FileCheckpointStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{job_id}.json"))
    }
}

fn state_error(action: &str, path: &Path, e: impl std::fmt::Display) -> QuarryError {
    QuarryError::State(format!("Failed to {action} {}: {e}", path.display()))
}

#[async_trait]
impl CheckpointStorage for FileCheckpointStorage {
    async fn load(&self, job_id: &JobId) -> Result<Option<JobCheckpoint>> {
        let path = self.path_for(job_id);
        match fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| state_error("parse checkpoint", &path, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(state_error("read checkpoint", &path, e)),
        }
    }

    async fn save(&self, checkpoint: &JobCheckpoint) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| state_error("create state directory", &self.dir, e))?;

        let path = self.path_for(&checkpoint.job_id());
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_vec_pretty(checkpoint)?;

        fs::write(&tmp, raw)
            .await
            .map_err(|e| state_error("write checkpoint", &tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| state_error("replace checkpoint", &path, e))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<JobCheckpoint>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(state_error("read state directory", &self.dir, e)),
        };

        let mut checkpoints = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = fs::read(&path).await?;
            match serde_json::from_slice::<JobCheckpoint>(&raw) {
                Ok(checkpoint) => checkpoints.push(checkpoint),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable checkpoint");
                }
            }
        }

        checkpoints.sort_by_key(|c| c.started_at);
        Ok(checkpoints)
    }

    async fn delete(&self, job_id: &JobId) -> Result<()> {
        let path = self.path_for(job_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(state_error("delete checkpoint", &path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::job::{ExportFilter, ExportJob, ExportOptions};
    use crate::domain::ids::CollectionId;
    use tempfile::TempDir;

    fn checkpoint() -> JobCheckpoint {
        let filter = ExportFilter::new(CollectionId::new("contact").unwrap());
        JobCheckpoint::new(ExportJob::new(
            filter,
            "json",
            ExportOptions::default(),
            10,
            "/tmp/quarry",
        ))
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = FileCheckpointStorage::new(dir.path().join("state"));
        let checkpoint = checkpoint();

        storage.save(&checkpoint).await.unwrap();
        let loaded = storage.load(&checkpoint.job_id()).await.unwrap().unwrap();

        assert_eq!(loaded.job_id(), checkpoint.job_id());
        assert_eq!(loaded.job.format, "json");
        assert!(!dir
            .path()
            .join("state")
            .join(format!("{}.json.tmp", checkpoint.job_id()))
            .exists());
    }

    #[tokio::test]
    async fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        let storage = FileCheckpointStorage::new(dir.path());
        assert!(storage.load(&JobId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let dir = TempDir::new().unwrap();
        let storage = FileCheckpointStorage::new(dir.path());
        let first = checkpoint();
        let second = checkpoint();

        storage.save(&first).await.unwrap();
        storage.save(&second).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        assert_eq!(storage.list().await.unwrap().len(), 2);

        storage.delete(&first.job_id()).await.unwrap();
        storage.delete(&first.job_id()).await.unwrap();
        let remaining = storage.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].job_id(), second.job_id());
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileCheckpointStorage::new(dir.path().join("nope"));
        assert!(storage.list().await.unwrap().is_empty());
    }
}
