//! Record formatters
//!
//! A formatter turns submissions into the bytes of one data file: an
//! optional header, one atomic chunk per record, and an optional footer.
//! Formatters are looked up by identifier in a [`FormatRegistry`], an
//! explicit table of factories filled at startup.

pub mod columns;
pub mod delimited;
pub mod document;
pub mod table;

use crate::core::export::job::ExportOptions;
use crate::domain::ids::SubmissionId;
use crate::domain::submission::Submission;
use crate::domain::{QuarryError, Result};
use std::collections::HashMap;
use std::sync::Arc;

pub use columns::{Column, ColumnSet, MetaField};
pub use delimited::DelimitedFormatter;
pub use document::JsonDocumentFormatter;
pub use table::TableFormatter;

/// How a finished data file is placed inside an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveLayout {
    /// The data file goes in as one entry
    DataFile,
    /// Each record becomes its own document under `submission-<sid>/`
    DocumentPerRecord,
}

/// Serialization strategy for one output format
pub trait RecordFormatter: Send + Sync {
    /// Registry identifier
    fn id(&self) -> &'static str;

    /// Data file extension, without the dot
    fn extension(&self) -> &'static str;

    fn layout(&self) -> ArchiveLayout {
        ArchiveLayout::DataFile
    }

    /// Bytes written once when the data file is created
    fn header(&self, columns: &ColumnSet) -> Result<Vec<u8>>;

    /// Complete serialized form of one record
    fn record(&self, columns: &ColumnSet, submission: &Submission) -> Result<Vec<u8>>;

    /// Bytes written once when the data file is finalized
    fn footer(&self, _columns: &ColumnSet) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    /// Expands one stored record into a standalone archive document
    ///
    /// Only called for [`ArchiveLayout::DocumentPerRecord`] formatters, once
    /// per line of the data file.
    fn archive_document(&self, _record: &[u8]) -> Result<(SubmissionId, Vec<u8>)> {
        Err(QuarryError::Configuration(format!(
            "Format '{}' does not produce per-record documents",
            self.id()
        )))
    }
}

/// Builds a formatter for a set of export options
pub type FormatFactory = fn(&ExportOptions) -> Result<Arc<dyn RecordFormatter>>;

/// Table from format identifier to factory
#[derive(Clone, Default)]
pub struct FormatRegistry {
    factories: HashMap<&'static str, FormatFactory>,
}

impl FormatRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in formats
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(delimited::FORMAT_ID, |options| {
            Ok(Arc::new(DelimitedFormatter::new(options.delimiter_byte()?)))
        });
        registry.register(table::FORMAT_ID, |_| Ok(Arc::new(TableFormatter)));
        registry.register(document::FORMAT_ID, |_| Ok(Arc::new(JsonDocumentFormatter)));
        registry
    }

    pub fn register(&mut self, id: &'static str, factory: FormatFactory) {
        self.factories.insert(id, factory);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Creates the formatter registered under `id`
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown identifier
    pub fn create(&self, id: &str, options: &ExportOptions) -> Result<Arc<dyn RecordFormatter>> {
        let factory = self.factories.get(id).ok_or_else(|| {
            QuarryError::Configuration(format!(
                "Unknown export format '{id}'. Available formats: {}",
                self.ids().join(", ")
            ))
        })?;
        factory(options)
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.factories.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatRegistry")
            .field("formats", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_formats_registered() {
        let registry = FormatRegistry::with_defaults();
        assert_eq!(registry.ids(), vec!["delimited", "json", "table"]);
    }

    #[test]
    fn test_create_unknown_format() {
        let registry = FormatRegistry::with_defaults();
        let err = registry
            .create("xlsx", &ExportOptions::default())
            .err()
            .unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("xlsx"));
    }

    #[test]
    fn test_delimiter_selects_extension() {
        let registry = FormatRegistry::with_defaults();
        let tsv = ExportOptions {
            delimiter: '\t',
            ..ExportOptions::default()
        };

        assert_eq!(
            registry
                .create("delimited", &ExportOptions::default())
                .unwrap()
                .extension(),
            "csv"
        );
        assert_eq!(registry.create("delimited", &tsv).unwrap().extension(), "tsv");
    }

    #[test]
    fn test_unusable_delimiter_rejected() {
        let registry = FormatRegistry::with_defaults();
        for delimiter in ['§', '"', '\n'] {
            let options = ExportOptions {
                delimiter,
                ..ExportOptions::default()
            };
            let err = registry.create("delimited", &options).err().unwrap();
            assert!(err.is_configuration(), "{delimiter:?} should be rejected");
        }
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = FormatRegistry::new();
        assert!(!registry.contains("table"));
        registry.register("table", |_| Ok(Arc::new(TableFormatter)));
        assert!(registry.contains("table"));
        assert_eq!(
            registry
                .create("table", &ExportOptions::default())
                .unwrap()
                .layout(),
            ArchiveLayout::DataFile
        );
    }
}
