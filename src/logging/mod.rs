//! Logging and observability
//!
//! Structured logging built on `tracing`:
//! - Human-readable console output
//! - Optional JSON log files with daily or hourly rotation
//! - Helper macros for the events every export emits
//!
//! # Example
//!
//! ```no_run
//! use quarry::logging::init_logging;
//! use quarry::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of an export job
///
/// # Example
///
/// ```no_run
/// use quarry::log_export_start;
/// use quarry::domain::ids::{CollectionId, JobId};
///
/// let job_id = JobId::generate();
/// let collection_id = CollectionId::new("contact").unwrap();
/// log_export_start!(&job_id, &collection_id, "delimited");
/// ```
#[macro_export]
macro_rules! log_export_start {
    ($job_id:expr, $collection_id:expr, $format:expr) => {
        tracing::info!(
            job_id = %$job_id,
            collection_id = %$collection_id,
            format = $format,
            "Starting export"
        );
    };
}

/// Log the progress of one export step
///
/// # Example
///
/// ```no_run
/// use quarry::log_step_progress;
/// use quarry::core::export::ProgressCursor;
/// use quarry::domain::ids::{JobId, SubmissionId};
///
/// let job_id = JobId::generate();
/// let page: Vec<SubmissionId> = (1..=5).map(SubmissionId::new).collect();
/// let cursor = ProgressCursor::start(10).advance(&page, 5);
/// log_step_progress!(&job_id, cursor, 5);
/// ```
#[macro_export]
macro_rules! log_step_progress {
    ($job_id:expr, $cursor:expr, $written:expr) => {
        tracing::debug!(
            job_id = %$job_id,
            offset = $cursor.offset,
            last_sid = ?$cursor.last_sid.map(|sid| sid.value()),
            processed = $cursor.processed_count,
            total = $cursor.total_count,
            written = $written,
            progress_pct = format!("{:.1}", $cursor.percentage()),
            "Export step completed"
        );
    };
}

/// Log the completion of an export job
///
/// # Example
///
/// ```no_run
/// use quarry::log_export_complete;
/// use std::time::Duration;
///
/// let count = 42;
/// let duration = Duration::from_secs(10);
/// log_export_complete!(count, duration);
/// ```
#[macro_export]
macro_rules! log_export_complete {
    ($count:expr, $duration:expr) => {
        tracing::info!(
            count = $count,
            duration_ms = $duration.as_millis(),
            "Export completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use quarry::log_error_with_context;
/// use quarry::domain::QuarryError;
///
/// let error = QuarryError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = %$context,
            "Error occurred"
        );
    };
}
