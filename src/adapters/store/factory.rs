//! Submission source factory

use super::directory::DirectoryStore;
use super::traits::{SubmissionLoader, SubmissionQuery};
use crate::config::schema::SourceConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Query and loader halves of one source
#[derive(Clone)]
pub struct SourceHandles {
    pub query: Arc<dyn SubmissionQuery>,
    pub loader: Arc<dyn SubmissionLoader>,
}

impl SourceHandles {
    /// Uses one store for both roles
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: SubmissionQuery + SubmissionLoader + 'static,
    {
        Self {
            query: store.clone(),
            loader: store,
        }
    }
}

/// Opens the source described by the configuration
///
/// # Errors
///
/// Returns a source error if the directory cannot be indexed
pub async fn create_source(config: &SourceConfig) -> Result<SourceHandles> {
    tracing::info!(directory = %config.directory.display(), "Opening submission source");
    let store = DirectoryStore::open(&config.directory).await?;
    Ok(SourceHandles::from_store(Arc::new(store)))
}
