//! HTML table output

use super::{ColumnSet, RecordFormatter};
use crate::domain::submission::Submission;
use crate::domain::Result;

pub const FORMAT_ID: &str = "table";

/// Writes submissions as rows of a single HTML `<table>`
#[derive(Debug, Clone, Copy, Default)]
pub struct TableFormatter;

impl RecordFormatter for TableFormatter {
    fn id(&self) -> &'static str {
        FORMAT_ID
    }

    fn extension(&self) -> &'static str {
        "html"
    }

    fn header(&self, columns: &ColumnSet) -> Result<Vec<u8>> {
        let mut out = String::from("<table>\n<thead>\n");
        out.push_str(&row("th", columns.headers()));
        out.push_str("</thead>\n<tbody>\n");
        Ok(out.into_bytes())
    }

    fn record(&self, columns: &ColumnSet, submission: &Submission) -> Result<Vec<u8>> {
        Ok(row("td", columns.row(submission)).into_bytes())
    }

    fn footer(&self, _columns: &ColumnSet) -> Result<Vec<u8>> {
        Ok(b"</tbody>\n</table>\n".to_vec())
    }
}

fn row<I, T>(tag: &str, cells: I) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut out = String::from("<tr>");
    for cell in cells {
        out.push_str(&format!("<{tag}>{}</{tag}>", escape(cell.as_ref())));
    }
    out.push_str("</tr>\n");
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::job::{ExportOptions, HeaderFormat};
    use crate::core::format::MetaField;
    use crate::domain::collection::{Collection, Element};
    use crate::domain::ids::CollectionId;
    use crate::domain::submission::SubmissionBuilder;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_table_document_shape() {
        let collection = Collection::new(CollectionId::new("feedback").unwrap(), "Feedback")
            .with_element(Element::text("comment", "Comment"));
        let columns = ColumnSet::build(
            &collection,
            &ExportOptions {
                header_format: HeaderFormat::Key,
                excluded_columns: MetaField::ALL.iter().map(|m| m.key().to_string()).collect(),
                ..ExportOptions::default()
            },
        );
        let submission = SubmissionBuilder::new()
            .sid(1)
            .collection_id(collection.id.clone())
            .created(Utc::now())
            .value("comment", json!("<b>bold</b> & more"))
            .build()
            .unwrap();

        let formatter = TableFormatter;
        let mut html = formatter.header(&columns).unwrap();
        html.extend(formatter.record(&columns, &submission).unwrap());
        html.extend(formatter.footer(&columns).unwrap());

        assert_eq!(
            String::from_utf8(html).unwrap(),
            "<table>\n<thead>\n<tr><th>comment</th></tr>\n</thead>\n<tbody>\n\
             <tr><td>&lt;b&gt;bold&lt;/b&gt; &amp; more</td></tr>\n\
             </tbody>\n</table>\n"
        );
    }

    #[test]
    fn test_escape_newline() {
        assert_eq!(escape("a\nb"), "a<br>b");
    }
}
