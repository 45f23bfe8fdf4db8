//! Export orchestration and batch processing
//!
//! This module provides the core export logic for Quarry, including:
//! - The resumable batch exporter and its progress cursor
//! - The runner that checkpoints and drives jobs to completion
//! - Summary and reporting

pub mod cursor;
pub mod exporter;
pub mod job;
pub mod runner;
pub mod summary;

pub use cursor::{ProgressCursor, StepOutcome};
pub use exporter::{sha256_file, AttachmentEntry, BatchExporter, ExportArtifact, OutputMark};
pub use job::{
    ExportFilter, ExportJob, ExportOptions, ExportRange, HeaderFormat, ItemFormat,
    MultiValueFormat, SortOrder, SubmissionState,
};
pub use runner::ExportRunner;
pub use summary::{ExportError, ExportErrorType, ExportSummary};
