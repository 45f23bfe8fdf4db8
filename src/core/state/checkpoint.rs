//! Checkpoint model for resumable export jobs
//!
//! A checkpoint holds everything needed to continue a job in another
//! process: the job itself, the cursor after the last completed step and
//! the byte lengths of the output files at that point.

use crate::core::export::cursor::{ProgressCursor, StepOutcome};
use crate::core::export::exporter::{ExportArtifact, OutputMark};
use crate::core::export::job::ExportJob;
use crate::domain::ids::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Job status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created but `initialize` has not completed
    #[default]
    Pending,
    /// Steps are being executed
    InProgress,
    /// Stopped between steps by a shutdown signal; can be resumed
    Interrupted,
    /// Finalized; the artifact is ready for download
    Completed,
    /// A step or finalize failed and the output was deleted
    Failed,
    /// Abandoned by the caller and the output was deleted
    Aborted,
}

impl JobStatus {
    /// Whether the job has reached a state it cannot leave
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Aborted
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobStatus::Pending => "pending",
            JobStatus::InProgress => "in_progress",
            JobStatus::Interrupted => "interrupted",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Aborted => "aborted",
        };
        write!(f, "{name}")
    }
}

/// Persisted progress of one job
///
/// # Examples
///
/// ```
/// use quarry::core::export::job::{ExportFilter, ExportJob, ExportOptions};
/// use quarry::core::export::ProgressCursor;
/// use quarry::core::state::{JobCheckpoint, JobStatus};
/// use quarry::domain::ids::CollectionId;
///
/// let filter = ExportFilter::new(CollectionId::new("contact").unwrap());
/// let job = ExportJob::new(filter, "delimited", ExportOptions::default(), 100, "/tmp/quarry");
///
/// let mut checkpoint = JobCheckpoint::new(job);
/// checkpoint.mark_started(ProgressCursor::start(250), Default::default());
///
/// assert_eq!(checkpoint.status, JobStatus::InProgress);
/// assert!(checkpoint.is_resumable());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCheckpoint {
    pub job: ExportJob,

    /// Cursor after the last completed step
    pub cursor: ProgressCursor,

    /// Output lengths matching `cursor`
    #[serde(default)]
    pub mark: OutputMark,

    pub status: JobStatus,

    /// Steps completed so far
    pub steps: u64,

    pub started_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Set once the job is finalized
    pub artifact: Option<ExportArtifact>,

    /// Error message of a failed job
    pub error: Option<String>,
}

impl JobCheckpoint {
    pub fn new(job: ExportJob) -> Self {
        let now = Utc::now();
        Self {
            job,
            cursor: ProgressCursor::default(),
            mark: OutputMark::default(),
            status: JobStatus::Pending,
            steps: 0,
            started_at: now,
            updated_at: now,
            completed_at: None,
            artifact: None,
            error: None,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job.id
    }

    /// Whether the job can be continued from this checkpoint
    pub fn is_resumable(&self) -> bool {
        matches!(self.status, JobStatus::InProgress | JobStatus::Interrupted)
    }

    /// Duration from start until completion, or until the last update
    pub fn duration(&self) -> chrono::Duration {
        self.completed_at.unwrap_or(self.updated_at) - self.started_at
    }

    /// Records a successful `initialize`
    pub fn mark_started(&mut self, cursor: ProgressCursor, mark: OutputMark) {
        self.cursor = cursor;
        self.mark = mark;
        self.status = JobStatus::InProgress;
        self.updated_at = Utc::now();
    }

    /// Records a completed step
    pub fn record_step(&mut self, outcome: &StepOutcome, mark: OutputMark) {
        self.cursor = outcome.cursor;
        self.mark = mark;
        self.steps += 1;
        self.status = JobStatus::InProgress;
        self.updated_at = Utc::now();
    }

    pub fn mark_interrupted(&mut self) {
        self.status = JobStatus::Interrupted;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self, artifact: ExportArtifact) {
        let now = Utc::now();
        self.artifact = Some(artifact);
        self.status = JobStatus::Completed;
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        let now = Utc::now();
        self.error = Some(error.into());
        self.status = JobStatus::Failed;
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    pub fn mark_aborted(&mut self) {
        let now = Utc::now();
        self.status = JobStatus::Aborted;
        self.updated_at = now;
        self.completed_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archive::ArchiveKind;
    use crate::core::export::job::{ExportFilter, ExportOptions};
    use crate::domain::ids::{CollectionId, SubmissionId};
    use std::path::PathBuf;

    fn checkpoint() -> JobCheckpoint {
        let filter = ExportFilter::new(CollectionId::new("contact").unwrap());
        JobCheckpoint::new(ExportJob::new(
            filter,
            "delimited",
            ExportOptions::default(),
            10,
            "/tmp/quarry",
        ))
    }

    #[test]
    fn test_new_checkpoint_is_pending() {
        let checkpoint = checkpoint();
        assert_eq!(checkpoint.status, JobStatus::Pending);
        assert!(!checkpoint.is_resumable());
        assert_eq!(checkpoint.steps, 0);
    }

    #[test]
    fn test_record_step() {
        let mut checkpoint = checkpoint();
        checkpoint.mark_started(ProgressCursor::start(20), OutputMark::default());

        let page: Vec<SubmissionId> = (1..=10).map(SubmissionId::new).collect();
        let outcome = StepOutcome {
            cursor: ProgressCursor::start(20).advance(&page, 10),
            finished: 0.5,
            written: 10,
        };
        let mark = OutputMark {
            data_len: 120,
            manifest_len: 0,
        };
        checkpoint.record_step(&outcome, mark);

        assert_eq!(checkpoint.steps, 1);
        assert_eq!(checkpoint.cursor.processed_count, 10);
        assert_eq!(checkpoint.mark, mark);
        assert!(checkpoint.is_resumable());
    }

    #[test]
    fn test_terminal_states() {
        let mut failed = checkpoint();
        failed.mark_failed("disk full");
        assert!(failed.status.is_terminal());
        assert!(!failed.is_resumable());
        assert_eq!(failed.error.as_deref(), Some("disk full"));
        assert!(failed.completed_at.is_some());

        let mut interrupted = checkpoint();
        interrupted.mark_started(ProgressCursor::start(1), OutputMark::default());
        interrupted.mark_interrupted();
        assert!(!interrupted.status.is_terminal());
        assert!(interrupted.is_resumable());
    }

    #[test]
    fn test_checkpoint_serialization() {
        let mut checkpoint = checkpoint();
        checkpoint.mark_completed(ExportArtifact {
            path: PathBuf::from("/tmp/quarry/out.csv"),
            archive: ArchiveKind::None,
            data_file: None,
            record_count: 3,
            attachment_count: 0,
            size_bytes: 42,
            checksum: "ab".repeat(32),
        });

        let json = serde_json::to_string(&checkpoint).unwrap();
        assert!(json.contains("\"status\":\"completed\""));

        let restored: JobCheckpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.job_id(), checkpoint.job_id());
        assert_eq!(restored.artifact.unwrap().record_count, 3);
    }
}
