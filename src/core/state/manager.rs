//! State manager for checkpoint persistence

use super::checkpoint::JobCheckpoint;
use super::storage::CheckpointStorage;
use crate::domain::ids::JobId;
use crate::domain::Result;
use std::sync::Arc;

/// Loads and saves job checkpoints through a storage backend
pub struct StateManager {
    storage: Arc<dyn CheckpointStorage>,
}

impl StateManager {
    pub fn new_with_storage(storage: Arc<dyn CheckpointStorage>) -> Self {
        Self { storage }
    }

    /// Loads a checkpoint
    ///
    /// # Returns
    ///
    /// `Ok(Some(checkpoint))` if found, `Ok(None)` if the job is unknown.
    pub async fn load_checkpoint(&self, job_id: &JobId) -> Result<Option<JobCheckpoint>> {
        self.storage.load(job_id).await
    }

    pub async fn save_checkpoint(&self, checkpoint: &JobCheckpoint) -> Result<()> {
        self.storage.save(checkpoint).await
    }

    pub async fn list_checkpoints(&self) -> Result<Vec<JobCheckpoint>> {
        self.storage.list().await
    }

    pub async fn delete_checkpoint(&self, job_id: &JobId) -> Result<()> {
        self.storage.delete(job_id).await
    }

    /// Saves progress after a completed step
    ///
    /// Same as `save_checkpoint`, with a progress log line.
    pub async fn checkpoint_step(&self, checkpoint: &JobCheckpoint) -> Result<()> {
        tracing::debug!(
            job_id = %checkpoint.job.id,
            steps = checkpoint.steps,
            offset = checkpoint.cursor.offset,
            processed = checkpoint.cursor.processed_count,
            "Checkpointing step"
        );

        self.save_checkpoint(checkpoint).await
    }
}
