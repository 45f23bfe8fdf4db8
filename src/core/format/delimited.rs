//! Delimited text output
//!
//! One header row followed by one row per submission. Quoting follows RFC
//! 4180 via the `csv` crate, so a row is always a single well-formed line
//! set no matter what the cell contents are.

use super::{ColumnSet, RecordFormatter};
use crate::domain::submission::Submission;
use crate::domain::{QuarryError, Result};

pub const FORMAT_ID: &str = "delimited";

/// Writer for delimited text (CSV, TSV or any single-byte delimiter)
#[derive(Debug, Clone, Copy)]
pub struct DelimitedFormatter {
    delimiter: u8,
}

impl DelimitedFormatter {
    /// Creates a formatter writing `delimiter` between cells
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    fn encode_row<I, T>(&self, cells: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(cells)?;
        writer
            .into_inner()
            .map_err(|e| QuarryError::Serialization(format!("CSV flush error: {e}")))
    }
}

impl RecordFormatter for DelimitedFormatter {
    fn id(&self) -> &'static str {
        FORMAT_ID
    }

    fn extension(&self) -> &'static str {
        match self.delimiter {
            b',' => "csv",
            b'\t' => "tsv",
            _ => "txt",
        }
    }

    fn header(&self, columns: &ColumnSet) -> Result<Vec<u8>> {
        self.encode_row(columns.headers())
    }

    fn record(&self, columns: &ColumnSet, submission: &Submission) -> Result<Vec<u8>> {
        self.encode_row(columns.row(submission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::job::ExportOptions;
    use crate::core::format::MetaField;
    use crate::domain::collection::{Collection, Element};
    use crate::domain::ids::CollectionId;
    use crate::domain::submission::SubmissionBuilder;
    use chrono::Utc;
    use serde_json::json;

    fn columns() -> ColumnSet {
        let collection = Collection::new(CollectionId::new("feedback").unwrap(), "Feedback")
            .with_element(Element::text("comment", "Comment"));
        let mut excluded: Vec<String> = MetaField::ALL.iter().map(|m| m.key().to_string()).collect();
        excluded.retain(|k| k != "sid");
        ColumnSet::build(
            &collection,
            &ExportOptions {
                excluded_columns: excluded,
                ..ExportOptions::default()
            },
        )
    }

    fn submission(comment: &str) -> Submission {
        SubmissionBuilder::new()
            .sid(4)
            .collection_id(CollectionId::new("feedback").unwrap())
            .created(Utc::now())
            .value("comment", json!(comment))
            .build()
            .unwrap()
    }

    #[test]
    fn test_header_and_row() {
        let formatter = DelimitedFormatter::new(b',');
        let columns = columns();

        assert_eq!(formatter.header(&columns).unwrap(), b"Submission ID,Comment\n");
        assert_eq!(
            formatter.record(&columns, &submission("fine")).unwrap(),
            b"4,fine\n"
        );
    }

    #[test]
    fn test_quoting_keeps_record_atomic() {
        let formatter = DelimitedFormatter::new(b',');
        let row = formatter
            .record(&columns(), &submission("line one\nsaid \"hi\", then left"))
            .unwrap();

        assert_eq!(
            String::from_utf8(row).unwrap(),
            "4,\"line one\nsaid \"\"hi\"\", then left\"\n"
        );
    }

    #[test]
    fn test_tab_delimiter() {
        let formatter = DelimitedFormatter::new(b'\t');
        assert_eq!(formatter.extension(), "tsv");
        assert_eq!(
            formatter.header(&columns()).unwrap(),
            b"Submission ID\tComment\n"
        );
    }
}
