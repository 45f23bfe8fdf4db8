//! Submission domain model
//!
//! A submission is one stored response to a collection: fixed metadata plus
//! arbitrary key/value element data, some of which may reference binary
//! attachments stored on disk.

use super::ids::{CollectionId, SubmissionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Binary file referenced by a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Key of the file element the attachment belongs to
    pub element: String,

    /// File name as uploaded
    pub file_name: String,

    /// Location of the stored file
    pub path: PathBuf,
}

impl Attachment {
    pub fn new(
        element: impl Into<String>,
        file_name: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            element: element.into(),
            file_name: file_name.into(),
            path: path.into(),
        }
    }
}

/// A stored submission
///
/// # Examples
///
/// ```
/// use quarry::domain::submission::SubmissionBuilder;
/// use quarry::domain::ids::CollectionId;
/// use chrono::Utc;
/// use serde_json::json;
///
/// let submission = SubmissionBuilder::new()
///     .sid(1)
///     .collection_id(CollectionId::new("contact").unwrap())
///     .created(Utc::now())
///     .value("name", json!("Ada"))
///     .build()
///     .unwrap();
/// assert_eq!(submission.serial, 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub sid: SubmissionId,

    /// Per-collection sequence number
    pub serial: u64,

    #[serde(default)]
    pub uuid: String,

    pub collection_id: CollectionId,

    /// Owner user ID (0 = anonymous)
    #[serde(default)]
    pub uid: u64,

    pub created: DateTime<Utc>,

    #[serde(default)]
    pub completed: Option<DateTime<Utc>>,

    pub changed: DateTime<Utc>,

    #[serde(default)]
    pub in_draft: bool,

    #[serde(default = "default_langcode")]
    pub langcode: String,

    #[serde(default)]
    pub remote_addr: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    /// Element values keyed by element key
    #[serde(default)]
    pub data: BTreeMap<String, Value>,

    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Submission {
    pub fn builder() -> SubmissionBuilder {
        SubmissionBuilder::default()
    }

    /// Attachments belonging to one file element
    pub fn attachments_for<'a>(&'a self, element: &'a str) -> impl Iterator<Item = &'a Attachment> {
        self.attachments.iter().filter(move |a| a.element == element)
    }
}

/// Builder for constructing Submission instances
#[derive(Debug, Default)]
pub struct SubmissionBuilder {
    sid: Option<SubmissionId>,
    serial: Option<u64>,
    uuid: Option<String>,
    collection_id: Option<CollectionId>,
    uid: u64,
    created: Option<DateTime<Utc>>,
    completed: Option<DateTime<Utc>>,
    changed: Option<DateTime<Utc>>,
    in_draft: bool,
    langcode: Option<String>,
    remote_addr: Option<String>,
    notes: Option<String>,
    data: BTreeMap<String, Value>,
    attachments: Vec<Attachment>,
}

impl SubmissionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sid(mut self, sid: impl Into<SubmissionId>) -> Self {
        self.sid = Some(sid.into());
        self
    }

    /// Sets the serial; defaults to the submission ID
    pub fn serial(mut self, serial: u64) -> Self {
        self.serial = Some(serial);
        self
    }

    pub fn uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn collection_id(mut self, collection_id: CollectionId) -> Self {
        self.collection_id = Some(collection_id);
        self
    }

    pub fn uid(mut self, uid: u64) -> Self {
        self.uid = uid;
        self
    }

    pub fn created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn completed(mut self, completed: DateTime<Utc>) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn changed(mut self, changed: DateTime<Utc>) -> Self {
        self.changed = Some(changed);
        self
    }

    pub fn in_draft(mut self, in_draft: bool) -> Self {
        self.in_draft = in_draft;
        self
    }

    pub fn langcode(mut self, langcode: impl Into<String>) -> Self {
        self.langcode = Some(langcode.into());
        self
    }

    pub fn remote_addr(mut self, remote_addr: impl Into<String>) -> Self {
        self.remote_addr = Some(remote_addr.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Sets one element value
    pub fn value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Builds the Submission
    ///
    /// # Errors
    ///
    /// Returns an error if the submission ID, collection or creation time is
    /// missing
    pub fn build(self) -> Result<Submission, String> {
        let sid = self.sid.ok_or("sid is required")?;
        let created = self.created.ok_or("created is required")?;

        Ok(Submission {
            sid,
            serial: self.serial.unwrap_or(sid.value()),
            uuid: self.uuid.unwrap_or_default(),
            collection_id: self.collection_id.ok_or("collection_id is required")?,
            uid: self.uid,
            created,
            completed: self.completed,
            changed: self.changed.unwrap_or(created),
            in_draft: self.in_draft,
            langcode: self.langcode.unwrap_or_else(default_langcode),
            remote_addr: self.remote_addr,
            notes: self.notes,
            data: self.data,
            attachments: self.attachments,
        })
    }
}

fn default_langcode() -> String {
    "en".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection() -> CollectionId {
        CollectionId::new("contact").unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let created = Utc::now();
        let submission = SubmissionBuilder::new()
            .sid(5)
            .collection_id(collection())
            .created(created)
            .build()
            .unwrap();

        assert_eq!(submission.serial, 5);
        assert_eq!(submission.changed, created);
        assert_eq!(submission.langcode, "en");
        assert!(!submission.in_draft);
        assert!(submission.data.is_empty());
    }

    #[test]
    fn test_builder_missing_fields() {
        let result = SubmissionBuilder::new().sid(1).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_attachments_for_element() {
        let submission = SubmissionBuilder::new()
            .sid(1)
            .collection_id(collection())
            .created(Utc::now())
            .attachment(Attachment::new("cv", "cv.pdf", "/tmp/cv.pdf"))
            .attachment(Attachment::new("photo", "me.png", "/tmp/me.png"))
            .build()
            .unwrap();

        let cv: Vec<_> = submission.attachments_for("cv").collect();
        assert_eq!(cv.len(), 1);
        assert_eq!(cv[0].file_name, "cv.pdf");
    }

    #[test]
    fn test_submission_deserialize_minimal() {
        let json = json!({
            "sid": 3,
            "serial": 2,
            "collection_id": "contact",
            "created": "2024-05-01T10:00:00Z",
            "changed": "2024-05-01T10:05:00Z",
            "data": {"name": "Grace"}
        });

        let submission: Submission = serde_json::from_value(json).unwrap();
        assert_eq!(submission.sid.value(), 3);
        assert_eq!(submission.uid, 0);
        assert_eq!(submission.data["name"], json!("Grace"));
        assert!(submission.attachments.is_empty());
    }
}
