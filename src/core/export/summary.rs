//! Export summary and reporting
//!
//! Structures for tracking and reporting the result of one export run.

use super::exporter::ExportArtifact;
use super::job::ExportJob;
use crate::domain::ids::{CollectionId, JobId};
use crate::domain::QuarryError;
use std::time::Duration;

/// Summary of an export run
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub job_id: JobId,

    pub collection_id: CollectionId,

    pub format: String,

    /// Count taken at initialization
    pub total_count: u64,

    /// Rows or documents written, including earlier runs of a resumed job
    pub records_written: u64,

    /// Steps completed, including earlier runs of a resumed job
    pub steps: u64,

    /// Duration of this run
    pub duration: Duration,

    /// Delivered file, set when the job completed
    pub artifact: Option<ExportArtifact>,

    /// Whether this run continued an earlier checkpoint
    pub resumed: bool,

    /// Whether the run stopped on a shutdown signal
    pub interrupted: bool,

    /// Errors encountered during the run
    pub errors: Vec<ExportError>,
}

impl ExportSummary {
    /// Create an empty summary for a job
    pub fn new(job: &ExportJob) -> Self {
        Self {
            job_id: job.id,
            collection_id: job.filter.collection_id.clone(),
            format: job.format.clone(),
            total_count: 0,
            records_written: 0,
            steps: 0,
            duration: Duration::from_secs(0),
            artifact: None,
            resumed: false,
            interrupted: false,
            errors: Vec::new(),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: ExportError) {
        self.errors.push(error);
    }

    /// Whether the job produced its artifact without errors
    pub fn is_successful(&self) -> bool {
        self.artifact.is_some() && self.errors.is_empty()
    }

    /// Share of the initial count written, as a percentage
    ///
    /// Can fall short of 100 when records were deleted during the run.
    pub fn completion_rate(&self) -> f64 {
        if self.total_count == 0 {
            return 100.0;
        }
        (self.records_written as f64 / self.total_count as f64 * 100.0).min(100.0)
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            job_id = %self.job_id,
            collection_id = %self.collection_id,
            format = %self.format,
            total = self.total_count,
            written = self.records_written,
            steps = self.steps,
            duration_secs = self.duration.as_secs(),
            completion_rate = format!("{:.2}%", self.completion_rate()),
            resumed = self.resumed,
            interrupted = self.interrupted,
            "Export summary"
        );

        if let Some(artifact) = &self.artifact {
            tracing::info!(
                path = %artifact.path.display(),
                size_bytes = artifact.size_bytes,
                checksum = %artifact.checksum,
                "Export artifact"
            );
        }

        if !self.errors.is_empty() {
            tracing::warn!(error_count = self.errors.len(), "Export completed with errors");
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    message = %error.message,
                    "Export error"
                );
            }
        }
    }
}

/// Type of export error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportErrorType {
    /// Invalid job, unknown format or export disabled
    Configuration,
    /// Submission query or loading failed
    Source,
    /// Writing the output failed
    Io,
    /// Packaging the archive failed
    Archive,
    /// Checkpoint persistence failed
    State,
    /// Unknown error
    Unknown,
}

impl From<&QuarryError> for ExportErrorType {
    fn from(error: &QuarryError) -> Self {
        match error {
            QuarryError::Configuration(_) | QuarryError::Validation(_) => Self::Configuration,
            QuarryError::Source(_) | QuarryError::DataInconsistency(_) => Self::Source,
            QuarryError::Io(_) | QuarryError::Serialization(_) => Self::Io,
            QuarryError::Archive(_) => Self::Archive,
            QuarryError::State(_) => Self::State,
            _ => Self::Unknown,
        }
    }
}

/// Export error with context
#[derive(Debug, Clone)]
pub struct ExportError {
    pub error_type: ExportErrorType,

    pub message: String,

    /// Optional context (e.g., step number)
    pub context: Option<String>,
}

impl ExportError {
    pub fn new(error_type: ExportErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
            context: None,
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }
}

impl From<&QuarryError> for ExportError {
    fn from(error: &QuarryError) -> Self {
        Self::new(ExportErrorType::from(error), error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::job::{ExportFilter, ExportOptions};
    use crate::domain::SourceError;

    fn summary() -> ExportSummary {
        let job = ExportJob::new(
            ExportFilter::new(CollectionId::new("contact").unwrap()),
            "delimited",
            ExportOptions::default(),
            100,
            "/tmp/quarry",
        );
        ExportSummary::new(&job)
    }

    #[test]
    fn test_export_summary_creation() {
        let summary = summary();

        assert_eq!(summary.format, "delimited");
        assert_eq!(summary.records_written, 0);
        assert_eq!(summary.duration, Duration::from_secs(0));
        assert!(summary.errors.is_empty());
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_export_summary_with_duration() {
        let summary = summary().with_duration(Duration::from_secs(120));
        assert_eq!(summary.duration, Duration::from_secs(120));
    }

    #[test]
    fn test_completion_rate() {
        let mut summary = summary();
        assert_eq!(summary.completion_rate(), 100.0);

        summary.total_count = 200;
        summary.records_written = 150;
        assert_eq!(summary.completion_rate(), 75.0);
    }

    #[test]
    fn test_error_type_mapping() {
        let source = QuarryError::from(SourceError::QueryFailed("timeout".into()));
        assert_eq!(ExportErrorType::from(&source), ExportErrorType::Source);
        assert_eq!(
            ExportErrorType::from(&QuarryError::Archive("x".into())),
            ExportErrorType::Archive
        );

        let error = ExportError::from(&QuarryError::Io("disk full".into()))
            .with_context("step=2".to_string());
        assert_eq!(error.error_type, ExportErrorType::Io);
        assert!(error.message.contains("disk full"));
        assert_eq!(error.context.as_deref(), Some("step=2"));
    }

    #[test]
    fn test_export_summary_add_error() {
        let mut summary = summary();
        summary.add_error(ExportError::new(ExportErrorType::State, "Failed to save".to_string()));

        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].error_type, ExportErrorType::State);
    }
}
