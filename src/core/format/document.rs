//! JSON document output
//!
//! Each submission becomes one self-contained JSON object. The data file
//! stores them as JSON Lines so every step can append whole documents; when
//! packaged into an archive, each line is expanded into a pretty-printed
//! `submission-<sid>/submission-<sid>.json` entry.

use super::{ArchiveLayout, ColumnSet, MetaField, RecordFormatter};
use crate::domain::ids::SubmissionId;
use crate::domain::submission::Submission;
use crate::domain::{QuarryError, Result};
use serde_json::{json, Map, Value};

pub const FORMAT_ID: &str = "json";

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocumentFormatter;

impl JsonDocumentFormatter {
    /// Builds the document for one submission
    ///
    /// `sid` is always present since archive entries are named after it.
    pub fn document(columns: &ColumnSet, submission: &Submission) -> Value {
        let mut doc = Map::new();
        for meta in MetaField::ALL {
            if meta != MetaField::Sid && columns.is_excluded(meta.key()) {
                continue;
            }
            doc.insert(meta.key().to_string(), meta.json_value(submission));
        }
        doc.insert(
            "collection_id".to_string(),
            Value::from(submission.collection_id.as_str()),
        );

        let data: Map<String, Value> = submission
            .data
            .iter()
            .filter(|(key, _)| !columns.is_excluded(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        doc.insert("data".to_string(), Value::Object(data));

        let attachments: Vec<Value> = submission
            .attachments
            .iter()
            .filter(|a| !columns.is_excluded(&a.element))
            .map(|a| json!({"element": a.element, "file_name": a.file_name}))
            .collect();
        if !attachments.is_empty() {
            doc.insert("attachments".to_string(), Value::Array(attachments));
        }

        Value::Object(doc)
    }
}

impl RecordFormatter for JsonDocumentFormatter {
    fn id(&self) -> &'static str {
        FORMAT_ID
    }

    fn extension(&self) -> &'static str {
        "jsonl"
    }

    fn layout(&self) -> ArchiveLayout {
        ArchiveLayout::DocumentPerRecord
    }

    fn header(&self, _columns: &ColumnSet) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn record(&self, columns: &ColumnSet, submission: &Submission) -> Result<Vec<u8>> {
        let mut line = serde_json::to_vec(&Self::document(columns, submission))?;
        line.push(b'\n');
        Ok(line)
    }

    fn archive_document(&self, record: &[u8]) -> Result<(SubmissionId, Vec<u8>)> {
        let doc: Value = serde_json::from_slice(record)?;
        let sid = doc
            .get("sid")
            .and_then(Value::as_u64)
            .map(SubmissionId::new)
            .ok_or_else(|| {
                QuarryError::DataInconsistency("Stored document has no submission ID".to_string())
            })?;
        let mut pretty = serde_json::to_vec_pretty(&doc)?;
        pretty.push(b'\n');
        Ok((sid, pretty))
    }
}
