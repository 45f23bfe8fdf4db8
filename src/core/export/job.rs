//! Export job description
//!
//! An [`ExportJob`] fixes everything about one export run: which
//! submissions, which format, which formatting options and where the output
//! lives. It is immutable once the run starts and serialisable so a
//! checkpoint can restore it in another process.

use crate::core::archive::ArchiveKind;
use crate::domain::ids::{CollectionId, JobId};
use crate::domain::submission::Submission;
use crate::domain::{QuarryError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Submission state filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    #[default]
    All,
    Completed,
    Draft,
}

/// Sort order on the submission ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Range of submissions to export
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExportRange {
    /// Every submission matching the other filters
    #[default]
    All,
    /// The `count` most recent submissions (by submission ID)
    Latest { count: u64 },
    /// Inclusive submission ID range
    Sid {
        start: Option<u64>,
        end: Option<u64>,
    },
    /// Inclusive serial number range
    Serial {
        start: Option<u64>,
        end: Option<u64>,
    },
    /// Inclusive creation date range
    Date {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
}

/// Which submissions of a collection are exported, and in what order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFilter {
    pub collection_id: CollectionId,

    /// Only submissions owned by this user
    #[serde(default)]
    pub owner: Option<u64>,

    #[serde(default)]
    pub state: SubmissionState,

    #[serde(default)]
    pub range: ExportRange,

    #[serde(default)]
    pub order: SortOrder,
}

impl ExportFilter {
    /// Filter selecting every submission of a collection in ascending order
    pub fn new(collection_id: CollectionId) -> Self {
        Self {
            collection_id,
            owner: None,
            state: SubmissionState::All,
            range: ExportRange::All,
            order: SortOrder::Asc,
        }
    }

    pub fn with_owner(mut self, uid: u64) -> Self {
        self.owner = Some(uid);
        self
    }

    pub fn with_state(mut self, state: SubmissionState) -> Self {
        self.state = state;
        self
    }

    pub fn with_range(mut self, range: ExportRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Whether a submission passes the collection, owner, state and
    /// bounded-range filters
    ///
    /// `Latest` is not a per-record predicate; stores apply it after sorting.
    pub fn matches(&self, submission: &Submission) -> bool {
        if submission.collection_id != self.collection_id {
            return false;
        }

        if let Some(owner) = self.owner {
            if submission.uid != owner {
                return false;
            }
        }

        match self.state {
            SubmissionState::All => {}
            SubmissionState::Completed if submission.in_draft => return false,
            SubmissionState::Draft if !submission.in_draft => return false,
            _ => {}
        }

        match &self.range {
            ExportRange::All | ExportRange::Latest { .. } => true,
            ExportRange::Sid { start, end } => in_range(submission.sid.value(), *start, *end),
            ExportRange::Serial { start, end } => in_range(submission.serial, *start, *end),
            ExportRange::Date { start, end } => {
                start.map_or(true, |s| submission.created >= s)
                    && end.map_or(true, |e| submission.created <= e)
            }
        }
    }

    /// Validates the range bounds
    pub fn validate(&self) -> Result<()> {
        let reversed = match &self.range {
            ExportRange::Latest { count } if *count == 0 => {
                return Err(QuarryError::Configuration(
                    "Latest range count must be greater than 0".to_string(),
                ));
            }
            ExportRange::Sid {
                start: Some(s),
                end: Some(e),
            }
            | ExportRange::Serial {
                start: Some(s),
                end: Some(e),
            } => s > e,
            ExportRange::Date {
                start: Some(s),
                end: Some(e),
            } => s > e,
            _ => false,
        };

        if reversed {
            return Err(QuarryError::Configuration(format!(
                "Range start is after range end: {:?}",
                self.range
            )));
        }

        Ok(())
    }
}

fn in_range(value: u64, start: Option<u64>, end: Option<u64>) -> bool {
    start.map_or(true, |s| value >= s) && end.map_or(true, |e| value <= e)
}

/// Header cell style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderFormat {
    /// Element titles
    #[default]
    Label,
    /// Element keys
    Key,
}

/// How option values are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFormat {
    #[default]
    Label,
    Key,
}

/// Multi-value flattening policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiValueFormat {
    /// All sub-values joined in one cell
    #[default]
    Compact,
    /// One cell per sub-value
    Separate,
}

/// Per-format export options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Field delimiter for delimited text
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Separator used when several values share one cell
    #[serde(default = "default_multiple_delimiter")]
    pub multiple_delimiter: String,

    #[serde(default)]
    pub header_format: HeaderFormat,

    #[serde(default)]
    pub options_item_format: ItemFormat,

    #[serde(default)]
    pub options_format: MultiValueFormat,

    #[serde(default)]
    pub composite_format: MultiValueFormat,

    /// Column keys left out of the output
    #[serde(default)]
    pub excluded_columns: Vec<String>,

    /// Archive to package the output into
    #[serde(default)]
    pub archive: ArchiveKind,

    /// Copy attachment files into the archive
    #[serde(default)]
    pub include_attachments: bool,

    /// Keep the standalone data file next to the archive
    #[serde(default)]
    pub keep_data_file: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            multiple_delimiter: default_multiple_delimiter(),
            header_format: HeaderFormat::default(),
            options_item_format: ItemFormat::default(),
            options_format: MultiValueFormat::default(),
            composite_format: MultiValueFormat::default(),
            excluded_columns: Vec::new(),
            archive: ArchiveKind::default(),
            include_attachments: false,
            keep_data_file: false,
        }
    }
}

impl ExportOptions {
    /// Validates the options
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a delimiter that cannot be used in
    /// delimited text, an empty multiple-value separator, or attachments
    /// requested without an archive to put them in.
    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;

        if self.multiple_delimiter.is_empty() {
            return Err(QuarryError::Configuration(
                "multiple_delimiter cannot be empty".to_string(),
            ));
        }

        if self.include_attachments && self.archive == ArchiveKind::None {
            return Err(QuarryError::Configuration(
                "include_attachments requires an archive (tar or zip)".to_string(),
            ));
        }

        Ok(())
    }

    /// The field delimiter as the single byte written between cells
    pub fn delimiter_byte(&self) -> Result<u8> {
        match u8::try_from(self.delimiter) {
            Ok(byte) if byte.is_ascii() && !matches!(byte, b'"' | b'\n' | b'\r') => Ok(byte),
            _ => Err(QuarryError::Configuration(format!(
                "Invalid delimiter {:?}. Must be a single ASCII character other than a quote or newline",
                self.delimiter
            ))),
        }
    }

    /// Whether a column key is excluded
    pub fn is_excluded(&self, key: &str) -> bool {
        self.excluded_columns.iter().any(|c| c == key)
    }
}

fn default_delimiter() -> char {
    ','
}

fn default_multiple_delimiter() -> String {
    ";".to_string()
}

/// One export operation with a fixed filter and format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub id: JobId,

    pub filter: ExportFilter,

    /// Format identifier resolved through the format registry
    pub format: String,

    pub options: ExportOptions,

    /// Page size, fixed for the whole job
    pub batch_limit: usize,

    /// File name stem of the data file and archive
    pub base_name: String,

    /// Private working directory of this job
    pub work_dir: PathBuf,

    pub created_at: DateTime<Utc>,
}

impl ExportJob {
    /// Creates a job whose output lives under `<temp_dir>/<job_id>/`
    pub fn new(
        filter: ExportFilter,
        format: impl Into<String>,
        options: ExportOptions,
        batch_limit: usize,
        temp_dir: impl AsRef<Path>,
    ) -> Self {
        let id = JobId::generate();
        let base_name = format!("{}_submissions", filter.collection_id);
        Self {
            id,
            work_dir: temp_dir.as_ref().join(id.to_string()),
            filter,
            format: format.into(),
            options,
            batch_limit,
            base_name,
            created_at: Utc::now(),
        }
    }

    /// Overrides the output file name stem
    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    /// Path of the data file for a format extension
    pub fn data_file_path(&self, extension: &str) -> PathBuf {
        self.work_dir
            .join(format!("{}.{}", self.base_name, extension))
    }

    /// Path of the attachment manifest
    pub fn manifest_path(&self) -> PathBuf {
        self.work_dir.join("attachments.jsonl")
    }

    /// Path of the archive, if one is requested
    pub fn archive_path(&self) -> Option<PathBuf> {
        self.options
            .archive
            .extension()
            .map(|ext| self.work_dir.join(format!("{}.{}", self.base_name, ext)))
    }

    /// Validates the job before any output is created
    pub fn validate(&self) -> Result<()> {
        if self.batch_limit == 0 {
            return Err(QuarryError::Configuration(
                "batch_limit must be greater than 0".to_string(),
            ));
        }

        if self.base_name.is_empty()
            || self
                .base_name
                .contains(|c: char| c == '/' || c == '\\' || c == '\0')
        {
            return Err(QuarryError::Configuration(format!(
                "Invalid output file name '{}'",
                self.base_name
            )));
        }

        self.filter.validate()?;
        self.options.validate()
    }
}
