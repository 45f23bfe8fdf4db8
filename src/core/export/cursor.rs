//! Progress cursor threaded between export steps
//!
//! The cursor is an immutable value: every step returns a new one and the
//! scheduler hands it back on the next call.
//!
//! Pages are selected by key: the next page starts after `last_sid` in the
//! job's sort order, so submissions added or deleted while a job runs never
//! shift records into or out of a page that was already written.

use crate::domain::ids::SubmissionId;
use serde::{Deserialize, Serialize};

/// Pagination key and progress state of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressCursor {
    /// Submission IDs fetched so far, including ones that vanished
    pub offset: u64,

    /// Last submission ID of the previous page; `None` before the first page
    #[serde(default)]
    pub last_sid: Option<SubmissionId>,

    /// Records written to the output so far
    pub processed_count: u64,

    /// Collection size counted at initialization
    pub total_count: u64,
}

impl ProgressCursor {
    /// Cursor at the start of a job
    pub fn start(total_count: u64) -> Self {
        Self {
            offset: 0,
            last_sid: None,
            processed_count: 0,
            total_count,
        }
    }

    /// Returns the cursor after a page of ids of which `written` records
    /// were serialized
    pub fn advance(self, page: &[SubmissionId], written: usize) -> Self {
        Self {
            offset: self.offset + page.len() as u64,
            last_sid: page.last().copied().or(self.last_sid),
            processed_count: self.processed_count + written as u64,
            total_count: self.total_count,
        }
    }

    /// Whether every counted record has been processed
    pub fn is_exhausted(&self) -> bool {
        self.processed_count >= self.total_count
    }

    /// Progress in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        if self.total_count == 0 {
            return 1.0;
        }
        (self.processed_count as f64 / self.total_count as f64).min(1.0)
    }

    /// Progress as a percentage, for operator display
    pub fn percentage(&self) -> f64 {
        self.fraction() * 100.0
    }
}

/// Result of one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Cursor to pass to the next step
    pub cursor: ProgressCursor,

    /// Completion fraction; exactly `1.0` when the job is done
    pub finished: f64,

    /// Records written by this step
    pub written: usize,
}

impl StepOutcome {
    pub fn is_finished(&self) -> bool {
        self.finished >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sids(range: std::ops::RangeInclusive<u64>) -> Vec<SubmissionId> {
        range.map(SubmissionId::new).collect()
    }

    #[test]
    fn test_advance_is_monotonic() {
        let cursor = ProgressCursor::start(10);
        let next = cursor.advance(&sids(1..=4), 3);

        assert_eq!(cursor.offset, 0);
        assert_eq!(cursor.last_sid, None);
        assert_eq!(next.offset, 4);
        assert_eq!(next.last_sid, Some(SubmissionId::new(4)));
        assert_eq!(next.processed_count, 3);
        assert_eq!(next.total_count, 10);
        assert!(next.processed_count >= cursor.processed_count);
    }

    #[test]
    fn test_fraction_bounds() {
        assert_eq!(ProgressCursor::start(0).fraction(), 1.0);
        assert_eq!(ProgressCursor::start(4).advance(&sids(1..=2), 2).fraction(), 0.5);
        assert_eq!(ProgressCursor::start(2).advance(&sids(1..=5), 5).fraction(), 1.0);
    }

    #[test]
    fn test_exhausted() {
        let cursor = ProgressCursor::start(2);
        assert!(!cursor.is_exhausted());
        assert!(cursor.advance(&sids(1..=2), 2).is_exhausted());
    }

    #[test]
    fn test_empty_page_keeps_key() {
        let cursor = ProgressCursor::start(5).advance(&sids(1..=2), 2);
        let next = cursor.advance(&[], 0);
        assert_eq!(next.last_sid, Some(SubmissionId::new(2)));
        assert_eq!(next.offset, 2);
    }

    #[test]
    fn test_checkpoint_without_key_deserializes() {
        let cursor: ProgressCursor =
            serde_json::from_str(r#"{"offset":0,"processed_count":0,"total_count":3}"#).unwrap();
        assert_eq!(cursor.last_sid, None);
    }
}
