//! Column layout and cell rendering
//!
//! Converts a collection definition plus export options into an ordered set
//! of columns, then renders each submission into one cell per column. The
//! same layout drives the delimited and table formats, so a header row and
//! every data row always agree on width.

use crate::core::export::job::{ExportOptions, HeaderFormat, ItemFormat, MultiValueFormat};
use crate::domain::collection::{Collection, Element, ElementType};
use crate::domain::submission::Submission;
use serde_json::Value;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Submission metadata exported ahead of element columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
    Sid,
    Serial,
    Uuid,
    Created,
    Completed,
    Changed,
    InDraft,
    Uid,
    Langcode,
    RemoteAddr,
    Notes,
}

impl MetaField {
    pub const ALL: [MetaField; 11] = [
        MetaField::Serial,
        MetaField::Sid,
        MetaField::Uuid,
        MetaField::Created,
        MetaField::Completed,
        MetaField::Changed,
        MetaField::InDraft,
        MetaField::Uid,
        MetaField::Langcode,
        MetaField::RemoteAddr,
        MetaField::Notes,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            MetaField::Sid => "sid",
            MetaField::Serial => "serial",
            MetaField::Uuid => "uuid",
            MetaField::Created => "created",
            MetaField::Completed => "completed",
            MetaField::Changed => "changed",
            MetaField::InDraft => "in_draft",
            MetaField::Uid => "uid",
            MetaField::Langcode => "langcode",
            MetaField::RemoteAddr => "remote_addr",
            MetaField::Notes => "notes",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MetaField::Sid => "Submission ID",
            MetaField::Serial => "Serial number",
            MetaField::Uuid => "UUID",
            MetaField::Created => "Created",
            MetaField::Completed => "Completed",
            MetaField::Changed => "Changed",
            MetaField::InDraft => "Is draft",
            MetaField::Uid => "User ID",
            MetaField::Langcode => "Language",
            MetaField::RemoteAddr => "IP address",
            MetaField::Notes => "Notes",
        }
    }

    /// Typed JSON value, used by document formats
    pub fn json_value(&self, submission: &Submission) -> Value {
        match self {
            MetaField::Sid => Value::from(submission.sid.value()),
            MetaField::Serial => Value::from(submission.serial),
            MetaField::Uuid => Value::from(submission.uuid.as_str()),
            MetaField::Created => Value::from(submission.created.to_rfc3339()),
            MetaField::Completed => submission
                .completed
                .map(|t| Value::from(t.to_rfc3339()))
                .unwrap_or(Value::Null),
            MetaField::Changed => Value::from(submission.changed.to_rfc3339()),
            MetaField::InDraft => Value::from(submission.in_draft),
            MetaField::Uid => Value::from(submission.uid),
            MetaField::Langcode => Value::from(submission.langcode.as_str()),
            MetaField::RemoteAddr => submission
                .remote_addr
                .as_deref()
                .map(Value::from)
                .unwrap_or(Value::Null),
            MetaField::Notes => submission
                .notes
                .as_deref()
                .map(Value::from)
                .unwrap_or(Value::Null),
        }
    }

    fn render(&self, submission: &Submission) -> String {
        match self {
            MetaField::Sid => submission.sid.to_string(),
            MetaField::Serial => submission.serial.to_string(),
            MetaField::Uuid => submission.uuid.clone(),
            MetaField::Created => submission.created.format(TIMESTAMP_FORMAT).to_string(),
            MetaField::Completed => submission
                .completed
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
            MetaField::Changed => submission.changed.format(TIMESTAMP_FORMAT).to_string(),
            MetaField::InDraft => bool_cell(submission.in_draft),
            MetaField::Uid => submission.uid.to_string(),
            MetaField::Langcode => submission.langcode.clone(),
            MetaField::RemoteAddr => submission.remote_addr.clone().unwrap_or_default(),
            MetaField::Notes => submission.notes.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
enum ColumnSource {
    Meta(MetaField),
    /// Whole element in one cell
    Element(usize),
    /// One option of an options element, `X` when selected
    OptionFlag { element: usize, option: String },
    /// One sub-element of a composite element
    CompositePart { element: usize, sub_key: String },
}

/// One output column
#[derive(Debug, Clone)]
pub struct Column {
    /// Machine key (`element` or `element__sub`)
    pub key: String,
    /// Header cell text
    pub header: String,
    source: ColumnSource,
}

/// Ordered column layout for one collection and option set
#[derive(Debug, Clone)]
pub struct ColumnSet {
    columns: Vec<Column>,
    elements: Vec<Element>,
    multiple_delimiter: String,
    item_format: ItemFormat,
    header_format: HeaderFormat,
    excluded: Vec<String>,
}

impl ColumnSet {
    /// Derives the column layout
    pub fn build(collection: &Collection, options: &ExportOptions) -> Self {
        let mut columns = Vec::new();
        let header = |key: &str, title: &str| match options.header_format {
            HeaderFormat::Label => title.to_string(),
            HeaderFormat::Key => key.to_string(),
        };

        for meta in MetaField::ALL {
            if options.is_excluded(meta.key()) {
                continue;
            }
            columns.push(Column {
                key: meta.key().to_string(),
                header: header(meta.key(), meta.title()),
                source: ColumnSource::Meta(meta),
            });
        }

        for (index, element) in collection.elements.iter().enumerate() {
            if options.is_excluded(&element.key) {
                continue;
            }

            match (element.element_type, options.options_format, options.composite_format) {
                (ElementType::Options, MultiValueFormat::Separate, _) => {
                    for option in &element.options {
                        let key = format!("{}__{}", element.key, option.key);
                        if options.is_excluded(&key) {
                            continue;
                        }
                        columns.push(Column {
                            header: header(&key, &format!("{}: {}", element.title, option.label)),
                            key,
                            source: ColumnSource::OptionFlag {
                                element: index,
                                option: option.key.clone(),
                            },
                        });
                    }
                }
                (ElementType::Composite, _, MultiValueFormat::Separate) => {
                    for sub in &element.composite {
                        let key = format!("{}__{}", element.key, sub.key);
                        if options.is_excluded(&key) {
                            continue;
                        }
                        columns.push(Column {
                            header: header(&key, &format!("{}: {}", element.title, sub.title)),
                            key,
                            source: ColumnSource::CompositePart {
                                element: index,
                                sub_key: sub.key.clone(),
                            },
                        });
                    }
                }
                _ => columns.push(Column {
                    key: element.key.clone(),
                    header: header(&element.key, &element.title),
                    source: ColumnSource::Element(index),
                }),
            }
        }

        Self {
            columns,
            elements: collection.elements.clone(),
            multiple_delimiter: options.multiple_delimiter.clone(),
            item_format: options.options_item_format,
            header_format: options.header_format,
            excluded: options.excluded_columns.clone(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Header cells in column order
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }

    /// Whether a metadata or element key is excluded from output
    pub fn is_excluded(&self, key: &str) -> bool {
        self.excluded.iter().any(|c| c == key)
    }

    /// Renders one submission into cells, one per column
    pub fn row(&self, submission: &Submission) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| match &column.source {
                ColumnSource::Meta(meta) => meta.render(submission),
                ColumnSource::Element(index) => {
                    self.element_cell(&self.elements[*index], submission)
                }
                ColumnSource::OptionFlag { element, option } => {
                    let key = &self.elements[*element].key;
                    let selected = submission
                        .data
                        .get(key)
                        .map(|value| values_of(value).any(|v| scalar(v) == *option))
                        .unwrap_or(false);
                    if selected {
                        "X".to_string()
                    } else {
                        String::new()
                    }
                }
                ColumnSource::CompositePart { element, sub_key } => {
                    let key = &self.elements[*element].key;
                    submission
                        .data
                        .get(key)
                        .map(|value| {
                            self.join(
                                values_of(value)
                                    .filter_map(|item| item.get(sub_key.as_str()))
                                    .map(scalar),
                            )
                        })
                        .unwrap_or_default()
                }
            })
            .collect()
    }

    fn element_cell(&self, element: &Element, submission: &Submission) -> String {
        if element.element_type == ElementType::File {
            let names: Vec<String> = submission
                .attachments_for(&element.key)
                .map(|a| a.file_name.clone())
                .collect();
            if !names.is_empty() {
                return self.join(names.into_iter());
            }
        }

        let Some(value) = submission.data.get(&element.key) else {
            return String::new();
        };

        match element.element_type {
            ElementType::Options => self.join(values_of(value).map(|v| {
                let key = scalar(v);
                match self.item_format {
                    ItemFormat::Label => element
                        .option_label(&key)
                        .map(str::to_string)
                        .unwrap_or(key),
                    ItemFormat::Key => key,
                }
            })),
            ElementType::Composite => self.join(
                values_of(value)
                    .map(|item| self.compact_composite(element, item))
                    .filter(|s| !s.is_empty()),
            ),
            ElementType::Text | ElementType::File => self.join(values_of(value).map(scalar)),
        }
    }

    /// `sub: value` pairs of one composite item, in definition order
    fn compact_composite(&self, element: &Element, item: &Value) -> String {
        element
            .composite
            .iter()
            .filter_map(|sub| {
                let value = scalar(item.get(sub.key.as_str())?);
                if value.is_empty() {
                    return None;
                }
                let name = match self.header_format {
                    HeaderFormat::Label => &sub.title,
                    HeaderFormat::Key => &sub.key,
                };
                Some(format!("{name}: {value}"))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn join(&self, values: impl Iterator<Item = String>) -> String {
        values.collect::<Vec<_>>().join(&self.multiple_delimiter)
    }
}

/// Iterates the items of a multi-value, or the value itself
fn values_of(value: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Value::Array(items) => Box::new(items.iter()),
        Value::Null => Box::new(std::iter::empty()),
        other => Box::new(std::iter::once(other)),
    }
}

/// Plain-text rendering of a JSON value
fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => bool_cell(*b),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn bool_cell(value: bool) -> String {
    let cell = if value { "1" } else { "0" };
    cell.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collection::{OptionItem, SubElement};
    use crate::domain::ids::CollectionId;
    use crate::domain::submission::{Attachment, SubmissionBuilder};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn collection() -> Collection {
        Collection::new(CollectionId::new("contact").unwrap(), "Contact")
            .with_element(Element::text("name", "Name"))
            .with_element(
                Element::options(
                    "topics",
                    "Topics",
                    vec![
                        OptionItem::new("sales", "Sales"),
                        OptionItem::new("support", "Support"),
                    ],
                )
                .multiple(),
            )
            .with_element(Element::composite(
                "address",
                "Address",
                vec![SubElement::new("city", "City"), SubElement::new("zip", "Postal code")],
            ))
            .with_element(Element::file("cv", "CV"))
    }

    fn submission() -> Submission {
        SubmissionBuilder::new()
            .sid(9)
            .serial(3)
            .uuid("u-9")
            .collection_id(CollectionId::new("contact").unwrap())
            .created(Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap())
            .value("name", json!("Ada"))
            .value("topics", json!(["support", "sales"]))
            .value("address", json!({"city": "London", "zip": "N1"}))
            .attachment(Attachment::new("cv", "ada.pdf", "/files/ada.pdf"))
            .build()
            .unwrap()
    }

    fn meta_only_excluded() -> Vec<String> {
        MetaField::ALL.iter().map(|m| m.key().to_string()).collect()
    }

    #[test]
    fn test_compact_layout_and_row() {
        let options = ExportOptions {
            excluded_columns: meta_only_excluded(),
            ..ExportOptions::default()
        };
        let columns = ColumnSet::build(&collection(), &options);

        assert_eq!(columns.headers(), vec!["Name", "Topics", "Address", "CV"]);
        assert_eq!(
            columns.row(&submission()),
            vec!["Ada", "Support;Sales", "City: London, Postal code: N1", "ada.pdf"]
        );
    }

    #[test]
    fn test_separate_layout_with_keys() {
        let options = ExportOptions {
            excluded_columns: meta_only_excluded(),
            header_format: HeaderFormat::Key,
            options_item_format: ItemFormat::Key,
            options_format: MultiValueFormat::Separate,
            composite_format: MultiValueFormat::Separate,
            ..ExportOptions::default()
        };
        let columns = ColumnSet::build(&collection(), &options);

        assert_eq!(
            columns.headers(),
            vec![
                "name",
                "topics__sales",
                "topics__support",
                "address__city",
                "address__zip",
                "cv"
            ]
        );
        assert_eq!(
            columns.row(&submission()),
            vec!["Ada", "X", "X", "London", "N1", "ada.pdf"]
        );
    }

    #[test]
    fn test_metadata_columns_render() {
        let options = ExportOptions {
            excluded_columns: vec!["uuid".into(), "name".into(), "topics".into(), "address".into(), "cv".into()],
            ..ExportOptions::default()
        };
        let columns = ColumnSet::build(&collection(), &options);
        let row = columns.row(&submission());

        assert_eq!(columns.headers()[0], "Serial number");
        assert_eq!(row[0], "3");
        assert_eq!(row[1], "9");
        assert_eq!(row[2], "2024-03-01 08:30:00");
        assert_eq!(row[3], "");
        assert_eq!(row.len(), columns.len());
    }

    #[test]
    fn test_option_keys_compact() {
        let options = ExportOptions {
            excluded_columns: meta_only_excluded(),
            options_item_format: ItemFormat::Key,
            multiple_delimiter: "|".to_string(),
            ..ExportOptions::default()
        };
        let columns = ColumnSet::build(&collection(), &options);
        assert_eq!(columns.row(&submission())[1], "support|sales");
    }

    #[test]
    fn test_missing_values_render_empty() {
        let options = ExportOptions {
            excluded_columns: meta_only_excluded(),
            options_format: MultiValueFormat::Separate,
            ..ExportOptions::default()
        };
        let columns = ColumnSet::build(&collection(), &options);
        let empty = SubmissionBuilder::new()
            .sid(1)
            .collection_id(CollectionId::new("contact").unwrap())
            .created(Utc::now())
            .build()
            .unwrap();

        assert!(columns.row(&empty).iter().all(String::is_empty));
    }

    #[test]
    fn test_excluding_single_sub_column() {
        let mut excluded = meta_only_excluded();
        excluded.push("address__zip".to_string());
        let options = ExportOptions {
            excluded_columns: excluded,
            composite_format: MultiValueFormat::Separate,
            ..ExportOptions::default()
        };
        let columns = ColumnSet::build(&collection(), &options);
        assert_eq!(columns.headers(), vec!["Name", "Topics", "Address: City", "CV"]);
    }

    #[test]
    fn test_scalar_rendering() {
        assert_eq!(scalar(&json!(null)), "");
        assert_eq!(scalar(&json!(true)), "1");
        assert_eq!(scalar(&json!(2.5)), "2.5");
        assert_eq!(scalar(&json!("x")), "x");
    }
}
