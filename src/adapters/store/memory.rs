//! In-memory submission store

use super::traits::{page_after, select_ids, SubmissionLoader, SubmissionQuery};
use crate::core::export::job::ExportFilter;
use crate::domain::collection::Collection;
use crate::domain::ids::{CollectionId, SubmissionId};
use crate::domain::submission::Submission;
use crate::domain::{Result, SourceError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    collections: BTreeMap<CollectionId, Collection>,
    submissions: BTreeMap<SubmissionId, Submission>,
}

/// Submission store held entirely in memory
///
/// Records can be added and removed while a job is running, which makes it
/// the store of choice for exercising concurrent-change behavior.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, collection: Collection) -> Self {
        let inner = self.inner.get_mut();
        inner.collections.insert(collection.id.clone(), collection);
        self
    }

    pub fn with_submissions(mut self, submissions: impl IntoIterator<Item = Submission>) -> Self {
        let inner = self.inner.get_mut();
        for submission in submissions {
            inner.submissions.insert(submission.sid, submission);
        }
        self
    }

    pub async fn insert_submission(&self, submission: Submission) {
        self.inner
            .write()
            .await
            .submissions
            .insert(submission.sid, submission);
    }

    /// Removes a submission, returning it if it existed
    pub async fn remove_submission(&self, sid: SubmissionId) -> Option<Submission> {
        self.inner.write().await.submissions.remove(&sid)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.submissions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SubmissionQuery for MemoryStore {
    async fn collection(&self, id: &CollectionId) -> Result<Collection> {
        self.inner
            .read()
            .await
            .collections
            .get(id)
            .cloned()
            .ok_or_else(|| SourceError::CollectionNotFound(id.to_string()).into())
    }

    async fn count(&self, filter: &ExportFilter) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(select_ids(inner.submissions.values(), filter).len() as u64)
    }

    async fn page(
        &self,
        filter: &ExportFilter,
        after: Option<SubmissionId>,
        limit: usize,
    ) -> Result<Vec<SubmissionId>> {
        let inner = self.inner.read().await;
        Ok(page_after(
            select_ids(inner.submissions.values(), filter),
            filter.order,
            after,
            limit,
        ))
    }
}

#[async_trait]
impl SubmissionLoader for MemoryStore {
    async fn load_multiple(&self, ids: &[SubmissionId]) -> Result<Vec<Submission>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.submissions.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::job::SubmissionState;
    use crate::domain::submission::SubmissionBuilder;
    use chrono::Utc;

    fn contact() -> CollectionId {
        CollectionId::new("contact").unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_collection(Collection::new(contact(), "Contact"))
            .with_submissions((1..=4).map(|sid| {
                SubmissionBuilder::new()
                    .sid(sid)
                    .collection_id(contact())
                    .in_draft(sid == 4)
                    .created(Utc::now())
                    .build()
                    .unwrap()
            }))
    }

    #[tokio::test]
    async fn test_count_and_page() {
        let store = store();
        let filter = ExportFilter::new(contact()).with_state(SubmissionState::Completed);

        assert_eq!(store.count(&filter).await.unwrap(), 3);
        let page = store.page(&filter, Some(SubmissionId::new(1)), 5).await.unwrap();
        assert_eq!(page, vec![SubmissionId::new(2), SubmissionId::new(3)]);
    }

    #[tokio::test]
    async fn test_load_multiple_skips_missing() {
        let store = store();
        store.remove_submission(SubmissionId::new(2)).await;

        let loaded = store
            .load_multiple(&[SubmissionId::new(3), SubmissionId::new(2), SubmissionId::new(1)])
            .await
            .unwrap();
        let sids: Vec<u64> = loaded.iter().map(|s| s.sid.value()).collect();
        assert_eq!(sids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let err = store()
            .collection(&CollectionId::new("survey").unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("survey"));
    }
}
