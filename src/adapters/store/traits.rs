//! Submission source traits
//!
//! The exporter reads submissions through two narrow, read-only interfaces:
//! one that selects identifiers page by page and one that materializes full
//! records. Both are safe to share between concurrently running jobs.

use crate::core::export::job::{ExportFilter, ExportRange, SortOrder};
use crate::domain::collection::Collection;
use crate::domain::ids::{CollectionId, SubmissionId};
use crate::domain::submission::Submission;
use crate::domain::Result;
use async_trait::async_trait;

/// Query and pagination service
#[async_trait]
pub trait SubmissionQuery: Send + Sync {
    /// Loads a collection definition
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::CollectionNotFound`](crate::domain::SourceError)
    /// when the collection does not exist.
    async fn collection(&self, id: &CollectionId) -> Result<Collection>;

    /// Number of submissions matching the filter
    async fn count(&self, filter: &ExportFilter) -> Result<u64>;

    /// Up to `limit` matching submission IDs that come after `after` in the
    /// filter's sort order; `None` starts from the beginning
    async fn page(
        &self,
        filter: &ExportFilter,
        after: Option<SubmissionId>,
        limit: usize,
    ) -> Result<Vec<SubmissionId>>;
}

/// Record materializer
#[async_trait]
pub trait SubmissionLoader: Send + Sync {
    /// Loads full submissions in the order requested
    ///
    /// IDs that no longer exist are left out of the result rather than
    /// reported as errors.
    async fn load_multiple(&self, ids: &[SubmissionId]) -> Result<Vec<Submission>>;
}

/// Applies a filter to a set of submissions and returns the ordered IDs
///
/// `Latest { count }` keeps the `count` highest submission IDs before the
/// sort order is applied.
pub(crate) fn select_ids<'a>(
    records: impl Iterator<Item = &'a Submission>,
    filter: &ExportFilter,
) -> Vec<SubmissionId> {
    let mut ids: Vec<SubmissionId> = records
        .filter(|s| filter.matches(s))
        .map(|s| s.sid)
        .collect();
    ids.sort_unstable();
    ids.dedup();

    if let ExportRange::Latest { count } = filter.range {
        let keep = ids.len().min(usize::try_from(count).unwrap_or(usize::MAX));
        ids.drain(..ids.len() - keep);
    }

    if filter.order == SortOrder::Desc {
        ids.reverse();
    }
    ids
}

/// Takes the page following `after` out of an ID list sorted in `order`
pub(crate) fn page_after(
    ids: Vec<SubmissionId>,
    order: SortOrder,
    after: Option<SubmissionId>,
    limit: usize,
) -> Vec<SubmissionId> {
    ids.into_iter()
        .filter(|id| match (after, order) {
            (None, _) => true,
            (Some(last), SortOrder::Asc) => *id > last,
            (Some(last), SortOrder::Desc) => *id < last,
        })
        .take(limit)
        .collect()
}
