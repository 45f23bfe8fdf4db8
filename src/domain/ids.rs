//! Domain identifier types with validation
//!
//! Newtype wrappers keep collection, submission and job identifiers from
//! being mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Collection (form) identifier
///
/// A machine name made of lowercase ASCII letters, digits and underscores.
///
/// # Examples
///
/// ```
/// use quarry::domain::ids::CollectionId;
/// use std::str::FromStr;
///
/// let id = CollectionId::from_str("contact_us").unwrap();
/// assert_eq!(id.as_str(), "contact_us");
/// assert!(CollectionId::from_str("Contact Us").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId(String);

impl CollectionId {
    /// Creates a new CollectionId from a string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Collection ID cannot be empty".to_string());
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(format!(
                "Invalid collection ID '{id}'. Only lowercase letters, digits and underscores are allowed"
            ));
        }

        Ok(Self(id))
    }

    /// Returns the collection ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CollectionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for CollectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Submission identifier
///
/// The primary key of a submission and the stable sort key used for
/// pagination.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubmissionId(u64);

impl SubmissionId {
    /// Creates a new SubmissionId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Name of the per-submission directory inside archives
    pub fn directory_name(&self) -> String {
        format!("submission-{}", self.0)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubmissionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| format!("Invalid submission ID '{s}': {e}"))
    }
}

impl From<u64> for SubmissionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Export job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh random job ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short form used in log lines and file names
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| format!("Invalid job ID '{s}': {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_id_valid() {
        let id = CollectionId::new("contact").unwrap();
        assert_eq!(id.to_string(), "contact");
    }

    #[test]
    fn test_collection_id_rejects_empty_and_invalid() {
        assert!(CollectionId::new("").is_err());
        assert!(CollectionId::new("   ").is_err());
        assert!(CollectionId::new("contact-us").is_err());
        assert!(CollectionId::new("../etc").is_err());
    }

    #[test]
    fn test_submission_id_parse_and_directory() {
        let sid = SubmissionId::from_str("17").unwrap();
        assert_eq!(sid.value(), 17);
        assert_eq!(sid.directory_name(), "submission-17");
        assert!(SubmissionId::from_str("abc").is_err());
    }

    #[test]
    fn test_submission_id_ordering() {
        let mut ids = vec![SubmissionId::new(3), SubmissionId::new(1), SubmissionId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![1.into(), 2.into(), 3.into()]);
    }

    #[test]
    fn test_job_id_roundtrip_through_string() {
        let job_id = JobId::generate();
        let parsed = JobId::from_str(&job_id.to_string()).unwrap();
        assert_eq!(job_id, parsed);
        assert_eq!(job_id.short().len(), 8);
    }

    #[test]
    fn test_job_id_invalid() {
        assert!(JobId::from_str("not-a-uuid").is_err());
    }
}
