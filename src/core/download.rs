//! One-time download tokens for finished exports
//!
//! A token is issued only for a completed job. Delivering it copies the
//! artifact to its destination, verifies the checksum of the copy and
//! deletes the job's working directory. The token is spent on first use.

use crate::adapters::sink::FileSink;
use crate::core::export::{sha256_file, ExportArtifact};
use crate::core::state::{JobCheckpoint, JobStatus};
use crate::domain::ids::JobId;
use crate::domain::{QuarryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Opaque handle for one pending download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadToken(Uuid);

impl fmt::Display for DownloadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct PendingDownload {
    job_id: JobId,
    artifact: ExportArtifact,
    work_dir: PathBuf,
}

/// Registry of artifacts waiting to be picked up
pub struct DownloadRegistry {
    sink: Arc<dyn FileSink>,
    pending: Mutex<HashMap<DownloadToken, PendingDownload>>,
}

impl DownloadRegistry {
    pub fn new(sink: Arc<dyn FileSink>) -> Self {
        Self {
            sink,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Issues a token for a completed job
    ///
    /// # Errors
    ///
    /// Returns a download error when the job did not complete, so failed or
    /// aborted jobs never get a download link.
    pub async fn issue(&self, checkpoint: &JobCheckpoint) -> Result<DownloadToken> {
        let artifact = match (&checkpoint.status, &checkpoint.artifact) {
            (JobStatus::Completed, Some(artifact)) => artifact.clone(),
            (status, _) => {
                return Err(QuarryError::Download(format!(
                    "Job {} is {status}, nothing to download",
                    checkpoint.job.id
                )));
            }
        };

        let token = DownloadToken(Uuid::new_v4());
        self.pending.lock().await.insert(
            token,
            PendingDownload {
                job_id: checkpoint.job.id,
                artifact,
                work_dir: checkpoint.job.work_dir.clone(),
            },
        );
        tracing::debug!(job_id = %checkpoint.job.id, token = %token, "Download token issued");
        Ok(token)
    }

    /// Number of tokens not yet delivered
    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Copies the artifact into `destination` and spends the token
    ///
    /// Returns the path of the delivered file. The token is consumed even
    /// when the copy fails; the working directory is kept in that case.
    pub async fn deliver(&self, token: DownloadToken, destination: &Path) -> Result<PathBuf> {
        let download = self
            .pending
            .lock()
            .await
            .remove(&token)
            .ok_or_else(|| QuarryError::Download(format!("Unknown or spent token {token}")))?;

        let artifact = &download.artifact;
        let file_name = artifact.path.file_name().ok_or_else(|| {
            QuarryError::Download(format!("Artifact has no file name: {}", artifact.path.display()))
        })?;
        let target = destination.join(file_name);

        tokio::fs::create_dir_all(destination).await?;
        tokio::fs::copy(&artifact.path, &target).await.map_err(|e| {
            QuarryError::Io(format!(
                "Failed to copy {} to {}: {e}",
                artifact.path.display(),
                target.display()
            ))
        })?;

        let (checksum, _) = sha256_file(&target).await?;
        if checksum != artifact.checksum {
            let _ = tokio::fs::remove_file(&target).await;
            return Err(QuarryError::Download(format!(
                "Checksum mismatch for {}: expected {}, got {checksum}",
                target.display(),
                artifact.checksum
            )));
        }

        if let Some(data_file) = &artifact.data_file {
            let copy = destination.join(data_file.file_name().unwrap_or(file_name));
            tokio::fs::copy(data_file, &copy).await?;
        }

        self.sink.delete_dir(&download.work_dir).await?;
        tracing::info!(
            job_id = %download.job_id,
            path = %target.display(),
            "Export delivered"
        );
        Ok(target)
    }
}
