//! Configuration schema types
//!
//! This module defines the configuration structure that maps to `quarry.toml`.

use crate::core::archive::ArchiveKind;
use crate::core::export::job::{
    ExportFilter, ExportJob, ExportOptions, ExportRange, HeaderFormat, ItemFormat,
    MultiValueFormat, SortOrder, SubmissionState,
};
use crate::domain::ids::CollectionId;
use crate::domain::{QuarryError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main Quarry configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarryConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Submission source
    pub source: SourceConfig,

    /// What to export and where to put it
    pub export: ExportConfig,

    /// Archive packaging
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Checkpoint storage
    #[serde(default)]
    pub state: StateConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl QuarryConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.application.validate()?;
        self.source.validate()?;
        self.export.validate()?;
        self.state.validate()?;
        self.logging.validate()?;

        self.export_options()
            .validate()
            .map_err(|e| e.to_string())?;

        if self.export.temp_dir == self.export.output_dir {
            return Err("export.temp_dir and export.output_dir must differ".to_string());
        }
        Ok(())
    }

    /// Formatting and packaging options of the configured export
    pub fn export_options(&self) -> ExportOptions {
        let format = &self.export.options;
        ExportOptions {
            delimiter: format.delimiter,
            multiple_delimiter: format.multiple_delimiter.clone(),
            header_format: format.header_format,
            options_item_format: format.options_item_format,
            options_format: format.options_format,
            composite_format: format.composite_format,
            excluded_columns: format.excluded_columns.clone(),
            archive: self.archive.kind,
            include_attachments: self.archive.include_attachments,
            keep_data_file: self.archive.keep_data_file,
        }
    }

    /// Builds a new job from the `[export]` section
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the collection ID is invalid.
    pub fn build_job(&self) -> Result<ExportJob> {
        let collection_id =
            CollectionId::new(&self.export.collection).map_err(QuarryError::Configuration)?;

        let mut filter = ExportFilter::new(collection_id)
            .with_state(self.export.state)
            .with_range(self.export.range.clone())
            .with_order(self.export.order);
        if let Some(owner) = self.export.owner {
            filter = filter.with_owner(owner);
        }

        let job = ExportJob::new(
            filter,
            &self.export.format,
            self.export_options(),
            self.export.batch_limit,
            &self.export.temp_dir,
        );
        Ok(match &self.export.base_name {
            Some(base_name) => job.with_base_name(base_name),
            None => job,
        })
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Submission source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Root of a directory store (one subdirectory per collection)
    pub directory: PathBuf,
}

impl SourceConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.directory.as_os_str().is_empty() {
            return Err("source.directory cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Collection to export
    pub collection: String,

    /// Format identifier (delimited, table, json)
    #[serde(default = "default_format")]
    pub format: String,

    /// Submissions per step
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    /// Parent of the per-job working directories
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Where finished exports are delivered
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Output file name stem, `<collection>_submissions` when unset
    #[serde(default)]
    pub base_name: Option<String>,

    /// Only submissions owned by this user
    #[serde(default)]
    pub owner: Option<u64>,

    #[serde(default)]
    pub state: SubmissionState,

    #[serde(default)]
    pub range: ExportRange,

    #[serde(default)]
    pub order: SortOrder,

    /// Formatting options
    #[serde(default)]
    pub options: FormatConfig,
}

impl ExportConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        let collection_id = CollectionId::new(&self.collection)
            .map_err(|e| format!("Invalid export.collection: {e}"))?;

        if self.format.trim().is_empty() {
            return Err("export.format cannot be empty".to_string());
        }

        if self.batch_limit == 0 || self.batch_limit > 10_000 {
            return Err(format!(
                "export.batch_limit must be between 1 and 10000, got {}",
                self.batch_limit
            ));
        }

        if let Some(base_name) = &self.base_name {
            if base_name.is_empty() || base_name.contains(|c: char| c == '/' || c == '\\') {
                return Err(format!("Invalid export.base_name '{base_name}'"));
            }
        }

        ExportFilter::new(collection_id)
            .with_range(self.range.clone())
            .validate()
            .map_err(|e| e.to_string())
    }
}

/// Formatting options (`[export.options]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

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

    #[serde(default)]
    pub excluded_columns: Vec<String>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        let options = ExportOptions::default();
        Self {
            delimiter: options.delimiter,
            multiple_delimiter: options.multiple_delimiter,
            header_format: options.header_format,
            options_item_format: options.options_item_format,
            options_format: options.options_format,
            composite_format: options.composite_format,
            excluded_columns: options.excluded_columns,
        }
    }
}

/// Archive configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// none, tar or zip
    #[serde(rename = "type", default)]
    pub kind: ArchiveKind,

    #[serde(default)]
    pub include_attachments: bool,

    #[serde(default)]
    pub keep_data_file: bool,
}

/// Checkpoint storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Directory holding one JSON checkpoint per job
    #[serde(default = "default_state_directory")]
    pub directory: PathBuf,
}

impl StateConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.directory.as_os_str().is_empty() {
            return Err("state.directory cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            directory: default_state_directory(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,

    /// Rotated log files kept on disk
    #[serde(default = "default_local_max_files")]
    pub local_max_files: usize,
}

impl LoggingConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_max_files == 0 {
            return Err("logging.local_max_files must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
            local_max_files: default_local_max_files(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "delimited".to_string()
}

fn default_batch_limit() -> usize {
    500
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("quarry")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./exports")
}

fn default_delimiter() -> char {
    ','
}

fn default_multiple_delimiter() -> String {
    ";".to_string()
}

fn default_state_directory() -> PathBuf {
    PathBuf::from(".quarry/state")
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

fn default_local_max_files() -> usize {
    7
}
