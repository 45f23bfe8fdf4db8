//! Directory-backed submission store
//!
//! Layout under the root directory, one subdirectory per collection:
//!
//! ```text
//! <root>/<collection>/collection.json    collection definition
//! <root>/<collection>/submissions.jsonl  one submission per line
//! <root>/<collection>/files/...          attachment files (relative paths)
//! ```
//!
//! Opening the store reads every submission once to build a metadata index
//! with the byte offset of each line. Element data is not kept; full records
//! are re-read from disk when a page is materialized.

use super::traits::{page_after, select_ids, SubmissionLoader, SubmissionQuery};
use crate::core::export::job::ExportFilter;
use crate::domain::collection::Collection;
use crate::domain::ids::{CollectionId, SubmissionId};
use crate::domain::submission::Submission;
use crate::domain::{Result, SourceError};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tracing::{debug, info, warn};

pub const COLLECTION_FILE: &str = "collection.json";
pub const SUBMISSIONS_FILE: &str = "submissions.jsonl";

/// Metadata-only copy of a submission and where its line starts
#[derive(Debug, Clone)]
struct IndexEntry {
    meta: Submission,
    offset: u64,
}

#[derive(Debug)]
struct CollectionEntry {
    collection: Collection,
    dir: PathBuf,
    index: BTreeMap<SubmissionId, IndexEntry>,
}

/// Read-only store over a directory of JSON files
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    collections: BTreeMap<CollectionId, CollectionEntry>,
    locations: HashMap<SubmissionId, CollectionId>,
}

impl DirectoryStore {
    /// Opens the store and indexes every collection under `root`
    ///
    /// # Errors
    ///
    /// Returns a source error if the root cannot be read, a collection
    /// definition is malformed, or a submission line cannot be parsed.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let mut entries = tokio::fs::read_dir(&root).await.map_err(|e| {
            SourceError::Unavailable(format!("Cannot read {}: {e}", root.display()))
        })?;

        let mut collections = BTreeMap::new();
        let mut locations = HashMap::new();

        while let Some(entry) = entries.next_entry().await? {
            let dir = entry.path();
            let definition = dir.join(COLLECTION_FILE);
            if !entry.file_type().await?.is_dir() || !definition.exists() {
                continue;
            }

            let raw = tokio::fs::read(&definition).await?;
            let collection: Collection = serde_json::from_slice(&raw).map_err(|e| {
                SourceError::InvalidFormat(format!("{}: {e}", definition.display()))
            })?;

            let index = index_submissions(&dir.join(SUBMISSIONS_FILE), &collection.id).await?;
            for sid in index.keys() {
                if let Some(previous) = locations.insert(*sid, collection.id.clone()) {
                    return Err(SourceError::InvalidFormat(format!(
                        "Submission {sid} appears in both '{previous}' and '{}'",
                        collection.id
                    ))
                    .into());
                }
            }

            debug!(
                collection_id = %collection.id,
                submissions = index.len(),
                "Indexed collection"
            );
            collections.insert(
                collection.id.clone(),
                CollectionEntry {
                    collection,
                    dir,
                    index,
                },
            );
        }

        info!(
            root = %root.display(),
            collections = collections.len(),
            submissions = locations.len(),
            "Opened submission directory"
        );

        Ok(Self {
            root,
            collections,
            locations,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collection IDs found under the root
    pub fn collection_ids(&self) -> Vec<CollectionId> {
        self.collections.keys().cloned().collect()
    }

    fn entry(&self, id: &CollectionId) -> Result<&CollectionEntry> {
        self.collections
            .get(id)
            .ok_or_else(|| SourceError::CollectionNotFound(id.to_string()).into())
    }
}

async fn index_submissions(
    path: &Path,
    collection_id: &CollectionId,
) -> Result<BTreeMap<SubmissionId, IndexEntry>> {
    let mut index = BTreeMap::new();
    if !path.exists() {
        return Ok(index);
    }

    let mut reader = BufReader::new(File::open(path).await?);
    let mut line = String::new();
    let mut offset = 0u64;
    let mut line_number = 0usize;

    loop {
        line.clear();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            break;
        }
        line_number += 1;
        let start = offset;
        offset += read as u64;

        if line.trim().is_empty() {
            continue;
        }

        let mut meta: Submission = serde_json::from_str(&line).map_err(|e| {
            SourceError::InvalidFormat(format!("{}:{line_number}: {e}", path.display()))
        })?;
        if meta.collection_id != *collection_id {
            return Err(SourceError::InvalidFormat(format!(
                "{}:{line_number}: submission belongs to '{}', expected '{collection_id}'",
                path.display(),
                meta.collection_id
            ))
            .into());
        }

        meta.data.clear();
        meta.attachments.clear();
        index.insert(meta.sid, IndexEntry { meta, offset: start });
    }

    Ok(index)
}

#[async_trait]
impl SubmissionQuery for DirectoryStore {
    async fn collection(&self, id: &CollectionId) -> Result<Collection> {
        Ok(self.entry(id)?.collection.clone())
    }

    async fn count(&self, filter: &ExportFilter) -> Result<u64> {
        let entry = self.entry(&filter.collection_id)?;
        Ok(select_ids(entry.index.values().map(|e| &e.meta), filter).len() as u64)
    }

    async fn page(
        &self,
        filter: &ExportFilter,
        after: Option<SubmissionId>,
        limit: usize,
    ) -> Result<Vec<SubmissionId>> {
        let entry = self.entry(&filter.collection_id)?;
        Ok(page_after(
            select_ids(entry.index.values().map(|e| &e.meta), filter),
            filter.order,
            after,
            limit,
        ))
    }
}

#[async_trait]
impl SubmissionLoader for DirectoryStore {
    async fn load_multiple(&self, ids: &[SubmissionId]) -> Result<Vec<Submission>> {
        let mut readers: HashMap<CollectionId, BufReader<File>> = HashMap::new();
        let mut loaded = Vec::with_capacity(ids.len());
        let mut line = String::new();

        for sid in ids {
            let Some(collection_id) = self.locations.get(sid) else {
                continue;
            };
            let entry = self.entry(collection_id)?;
            let Some(indexed) = entry.index.get(sid) else {
                continue;
            };

            let reader = match readers.entry(collection_id.clone()) {
                Entry::Occupied(occupied) => occupied.into_mut(),
                Entry::Vacant(vacant) => {
                    let file = File::open(entry.dir.join(SUBMISSIONS_FILE))
                        .await
                        .map_err(|e| SourceError::LoadFailed(e.to_string()))?;
                    vacant.insert(BufReader::new(file))
                }
            };

            reader.seek(SeekFrom::Start(indexed.offset)).await?;
            line.clear();
            reader.read_line(&mut line).await?;

            let mut submission: Submission = match serde_json::from_str(&line) {
                Ok(submission) => submission,
                Err(e) => {
                    warn!(sid = %sid, error = %e, "Submission line changed since indexing, skipping");
                    continue;
                }
            };
            if submission.sid != *sid {
                warn!(sid = %sid, "Submission moved since indexing, skipping");
                continue;
            }

            for attachment in &mut submission.attachments {
                if attachment.path.is_relative() {
                    attachment.path = entry.dir.join(&attachment.path);
                }
            }
            loaded.push(submission);
        }

        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_fixture(root: &Path) {
        let dir = root.join("contact");
        std::fs::create_dir_all(dir.join("files")).unwrap();
        std::fs::write(
            dir.join(COLLECTION_FILE),
            json!({
                "id": "contact",
                "title": "Contact",
                "elements": [{"key": "name", "title": "Name", "type": "text"}]
            })
            .to_string(),
        )
        .unwrap();

        let lines: Vec<String> = (1..=3)
            .map(|sid| {
                json!({
                    "sid": sid,
                    "collection_id": "contact",
                    "created": "2024-05-01T10:00:00Z",
                    "changed": "2024-05-01T10:00:00Z",
                    "data": {"name": format!("person {sid}")},
                    "attachments": [{"element": "cv", "file_name": "cv.txt", "path": "files/cv.txt"}]
                })
                .to_string()
            })
            .collect();
        std::fs::write(dir.join(SUBMISSIONS_FILE), lines.join("\n") + "\n").unwrap();
    }

    #[tokio::test]
    async fn test_open_and_query() {
        let root = TempDir::new().unwrap();
        write_fixture(root.path());

        let store = DirectoryStore::open(root.path()).await.unwrap();
        let contact = CollectionId::new("contact").unwrap();
        let filter = ExportFilter::new(contact.clone());

        assert_eq!(store.collection_ids(), vec![contact.clone()]);
        assert_eq!(store.count(&filter).await.unwrap(), 3);
        assert_eq!(
            store.page(&filter, Some(SubmissionId::new(2)), 10).await.unwrap(),
            vec![SubmissionId::new(3)]
        );
    }

    #[tokio::test]
    async fn test_load_resolves_attachment_paths() {
        let root = TempDir::new().unwrap();
        write_fixture(root.path());
        let store = DirectoryStore::open(root.path()).await.unwrap();

        let loaded = store
            .load_multiple(&[SubmissionId::new(2), SubmissionId::new(99)])
            .await
            .unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].data["name"], json!("person 2"));
        assert_eq!(
            loaded[0].attachments[0].path,
            root.path().join("contact").join("files/cv.txt")
        );
    }

    #[tokio::test]
    async fn test_malformed_line_is_reported() {
        let root = TempDir::new().unwrap();
        write_fixture(root.path());
        std::fs::write(
            root.path().join("contact").join(SUBMISSIONS_FILE),
            "{not json}\n",
        )
        .unwrap();

        let err = DirectoryStore::open(root.path()).await.unwrap_err();
        assert!(err.to_string().contains(":1:"));
    }
}
