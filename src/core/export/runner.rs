//! Export runner
//!
//! Plays the long-running task scheduler for [`BatchExporter`]: calls
//! `initialize` once, `step` until the job reports it is finished, then
//! `finalize`. The cursor is checkpointed after every step. Any error from
//! a step or from finalize aborts the job, so no partial output survives,
//! and is returned to the caller exactly once.
//!
//! A shutdown signal is honored between steps only. The job is then left
//! `Interrupted` and can be continued with [`ExportRunner::resume`].

use super::exporter::BatchExporter;
use super::job::ExportJob;
use super::summary::{ExportError, ExportErrorType, ExportSummary};
use crate::core::state::{JobCheckpoint, JobStatus, StateManager};
use crate::domain::ids::JobId;
use crate::domain::{QuarryError, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Drives export jobs to completion and persists their progress
pub struct ExportRunner {
    exporter: BatchExporter,
    state: Arc<StateManager>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ExportRunner {
    pub fn new(exporter: BatchExporter, state: Arc<StateManager>) -> Self {
        Self {
            exporter,
            state,
            shutdown: None,
        }
    }

    /// Stops between steps once the channel carries `true`
    pub fn with_shutdown_signal(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn exporter(&self) -> &BatchExporter {
        &self.exporter
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Runs a new job from the start
    ///
    /// # Errors
    ///
    /// Configuration errors are returned before any file or checkpoint is
    /// created. Any later error aborts the job and is returned after the
    /// checkpoint has been marked failed.
    pub async fn run(&self, job: ExportJob) -> Result<ExportSummary> {
        let started = Instant::now();

        let cursor = match self.exporter.initialize(&job).await {
            Ok(cursor) => cursor,
            Err(e) => {
                if !e.is_configuration() {
                    self.cleanup(&job).await;
                }
                crate::log_error_with_context!(&e, "Failed to initialize export");
                return Err(e);
            }
        };

        let mut checkpoint = JobCheckpoint::new(job);
        let mark = match self.exporter.mark(&checkpoint.job).await {
            Ok(mark) => mark,
            Err(e) => return self.fail(checkpoint, e).await,
        };
        checkpoint.mark_started(cursor, mark);
        if let Err(e) = self.state.save_checkpoint(&checkpoint).await {
            return self.fail(checkpoint, e).await;
        }

        self.drive(checkpoint, started, false).await
    }

    /// Continues an interrupted or crashed job from its last checkpoint
    ///
    /// # Errors
    ///
    /// Returns a state error if the job is unknown or already finished.
    pub async fn resume(&self, job_id: &JobId) -> Result<ExportSummary> {
        let started = Instant::now();
        let checkpoint = self
            .state
            .load_checkpoint(job_id)
            .await?
            .ok_or_else(|| QuarryError::State(format!("No checkpoint found for job {job_id}")))?;

        if !checkpoint.is_resumable() {
            return Err(QuarryError::State(format!(
                "Job {job_id} is {} and cannot be resumed",
                checkpoint.status
            )));
        }

        tracing::info!(
            job_id = %job_id,
            offset = checkpoint.cursor.offset,
            processed = checkpoint.cursor.processed_count,
            total = checkpoint.cursor.total_count,
            "Resuming export"
        );

        if let Err(e) = self.exporter.rewind(&checkpoint.job, checkpoint.mark).await {
            return self.fail(checkpoint, e).await;
        }

        self.drive(checkpoint, started, true).await
    }

    /// Abandons a job and deletes its output
    pub async fn abort(&self, job_id: &JobId) -> Result<()> {
        let mut checkpoint = self
            .state
            .load_checkpoint(job_id)
            .await?
            .ok_or_else(|| QuarryError::State(format!("No checkpoint found for job {job_id}")))?;

        if matches!(checkpoint.status, JobStatus::Failed | JobStatus::Aborted) {
            return Ok(());
        }

        self.exporter.abort(&checkpoint.job).await?;
        checkpoint.mark_aborted();
        self.state.save_checkpoint(&checkpoint).await
    }

    async fn drive(
        &self,
        mut checkpoint: JobCheckpoint,
        started: Instant,
        resumed: bool,
    ) -> Result<ExportSummary> {
        let mut summary = ExportSummary::new(&checkpoint.job);
        summary.resumed = resumed;
        summary.total_count = checkpoint.cursor.total_count;

        loop {
            if self.shutdown_requested() {
                tracing::warn!(
                    job_id = %checkpoint.job.id,
                    processed = checkpoint.cursor.processed_count,
                    "Shutdown requested, stopping between steps"
                );
                checkpoint.mark_interrupted();
                if let Err(e) = self.state.save_checkpoint(&checkpoint).await {
                    summary.add_error(ExportError::from(&e));
                }
                summary.interrupted = true;
                summary.steps = checkpoint.steps;
                summary.records_written = checkpoint.cursor.processed_count;
                return Ok(summary.with_duration(started.elapsed()));
            }

            let outcome = match self.exporter.step(&checkpoint.job, checkpoint.cursor).await {
                Ok(outcome) => outcome,
                Err(e) => return self.fail(checkpoint, e).await,
            };
            let mark = match self.exporter.mark(&checkpoint.job).await {
                Ok(mark) => mark,
                Err(e) => return self.fail(checkpoint, e).await,
            };
            checkpoint.record_step(&outcome, mark);

            tracing::info!(
                job_id = %checkpoint.job.id,
                step = checkpoint.steps,
                processed = checkpoint.cursor.processed_count,
                total = checkpoint.cursor.total_count,
                progress = format!("{:.1}%", outcome.finished * 100.0),
                "Export progress"
            );

            if let Err(e) = self.state.checkpoint_step(&checkpoint).await {
                tracing::warn!(job_id = %checkpoint.job.id, error = %e, "Failed to save checkpoint");
                summary.add_error(
                    ExportError::new(ExportErrorType::State, e.to_string())
                        .with_context(format!("step={}", checkpoint.steps)),
                );
            }

            if outcome.is_finished() {
                break;
            }
        }

        let artifact = match self
            .exporter
            .finalize(&checkpoint.job, checkpoint.cursor)
            .await
        {
            Ok(artifact) => artifact,
            Err(e) => return self.fail(checkpoint, e).await,
        };

        checkpoint.mark_completed(artifact.clone());
        if let Err(e) = self.state.save_checkpoint(&checkpoint).await {
            summary.add_error(ExportError::from(&e));
        }

        summary.steps = checkpoint.steps;
        summary.records_written = checkpoint.cursor.processed_count;
        summary.artifact = Some(artifact);
        let summary = summary.with_duration(started.elapsed());

        crate::log_export_complete!(summary.records_written, summary.duration);
        Ok(summary)
    }

    /// Aborts the job, records the failure and hands the error back
    async fn fail(&self, mut checkpoint: JobCheckpoint, error: QuarryError) -> Result<ExportSummary> {
        crate::log_error_with_context!(&error, format!("Export job {} failed", checkpoint.job.id));
        self.cleanup(&checkpoint.job).await;

        checkpoint.mark_failed(error.to_string());
        if let Err(e) = self.state.save_checkpoint(&checkpoint).await {
            tracing::warn!(job_id = %checkpoint.job.id, error = %e, "Failed to record job failure");
        }
        Err(error)
    }

    async fn cleanup(&self, job: &ExportJob) {
        if let Err(e) = self.exporter.abort(job).await {
            tracing::error!(job_id = %job.id, error = %e, "Failed to delete partial output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sink::LocalFileSink;
    use crate::adapters::store::MemoryStore;
    use crate::core::export::job::{ExportFilter, ExportOptions};
    use crate::core::format::FormatRegistry;
    use crate::core::state::FileCheckpointStorage;
    use crate::domain::collection::{Collection, Element};
    use crate::domain::ids::CollectionId;
    use crate::domain::submission::SubmissionBuilder;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn contact() -> CollectionId {
        CollectionId::new("contact").unwrap()
    }

    fn runner(dir: &TempDir, count: u64) -> ExportRunner {
        let store = Arc::new(
            MemoryStore::new()
                .with_collection(
                    Collection::new(contact(), "Contact").with_element(Element::text("name", "Name")),
                )
                .with_submissions((1..=count).map(|sid| {
                    SubmissionBuilder::new()
                        .sid(sid)
                        .collection_id(contact())
                        .created(Utc::now())
                        .value("name", json!(format!("n{sid}")))
                        .build()
                        .unwrap()
                })),
        );
        let exporter = BatchExporter::new(
            store.clone(),
            store,
            Arc::new(LocalFileSink),
            Arc::new(FormatRegistry::with_defaults()),
        );
        let state = Arc::new(StateManager::new_with_storage(Arc::new(
            FileCheckpointStorage::new(dir.path().join("state")),
        )));
        ExportRunner::new(exporter, state)
    }

    fn job(dir: &TempDir, format: &str) -> ExportJob {
        ExportJob::new(
            ExportFilter::new(contact()),
            format,
            ExportOptions::default(),
            2,
            dir.path().join("tmp"),
        )
    }

    #[tokio::test]
    async fn test_run_completes_and_checkpoints() {
        let dir = TempDir::new().unwrap();
        let runner = runner(&dir, 5);
        let job = job(&dir, "json");
        let job_id = job.id;

        let summary = runner.run(job).await.unwrap();

        assert!(summary.is_successful());
        assert_eq!(summary.records_written, 5);
        assert_eq!(summary.steps, 3);

        let checkpoint = runner.state.load_checkpoint(&job_id).await.unwrap().unwrap();
        assert_eq!(checkpoint.status, JobStatus::Completed);
        assert!(runner.resume(&job_id).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_format_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let runner = runner(&dir, 1);
        let job = job(&dir, "xlsx");
        let job_id = job.id;
        let work_dir = job.work_dir.clone();

        let err = runner.run(job).await.unwrap_err();

        assert!(err.is_configuration());
        assert!(!work_dir.exists());
        assert!(runner.state.load_checkpoint(&job_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_then_resume() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = watch::channel(true);
        let runner = runner(&dir, 3).with_shutdown_signal(rx);
        let job = job(&dir, "delimited");
        let job_id = job.id;

        let summary = runner.run(job).await.unwrap();
        assert!(summary.interrupted);
        assert!(summary.artifact.is_none());
        let checkpoint = runner.state.load_checkpoint(&job_id).await.unwrap().unwrap();
        assert_eq!(checkpoint.status, JobStatus::Interrupted);

        tx.send(false).unwrap();
        let resumed = runner.resume(&job_id).await.unwrap();
        assert!(resumed.resumed);
        assert_eq!(resumed.records_written, 3);
        let artifact = resumed.artifact.unwrap();
        let lines = std::fs::read_to_string(artifact.path).unwrap().lines().count();
        assert_eq!(lines, 4);
    }

    #[tokio::test]
    async fn test_abort_marks_checkpoint() {
        let dir = TempDir::new().unwrap();
        let (_tx, rx) = watch::channel(true);
        let runner = runner(&dir, 3).with_shutdown_signal(rx);
        let job = job(&dir, "delimited");
        let job_id = job.id;
        let work_dir = job.work_dir.clone();

        runner.run(job).await.unwrap();
        runner.abort(&job_id).await.unwrap();

        assert!(!work_dir.exists());
        let checkpoint = runner.state.load_checkpoint(&job_id).await.unwrap().unwrap();
        assert_eq!(checkpoint.status, JobStatus::Aborted);
    }
}
