//! Core business logic for Quarry.
//!
//! # Modules
//!
//! - [`export`] - Batch exporter, runner and summary
//! - [`format`] - Format registry, column layout and record formatters
//! - [`archive`] - tar.gz and zip packaging
//! - [`state`] - Job checkpoints for resuming interrupted exports
//! - [`download`] - One-time download tokens for finished artifacts
//!
//! # Export Workflow
//!
//! 1. **Initialize**: Resolve the format, check the collection, write the header
//! 2. **Step**: Export one page of submissions and checkpoint the cursor
//! 3. **Finalize**: Write the footer and package the archive
//! 4. **Deliver**: Copy the artifact once and remove the working directory
//!
//! # Example
//!
//! ```rust,no_run
//! use quarry::adapters::sink::LocalFileSink;
//! use quarry::adapters::store::DirectoryStore;
//! use quarry::core::export::{BatchExporter, ExportFilter, ExportJob, ExportOptions, ExportRunner};
//! use quarry::core::format::FormatRegistry;
//! use quarry::core::state::{FileCheckpointStorage, StateManager};
//! use quarry::domain::CollectionId;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(DirectoryStore::open("data").await?);
//! let exporter = BatchExporter::new(
//!     store.clone(),
//!     store,
//!     Arc::new(LocalFileSink),
//!     Arc::new(FormatRegistry::with_defaults()),
//! );
//! let state = Arc::new(StateManager::new_with_storage(Arc::new(
//!     FileCheckpointStorage::new(".quarry/state"),
//! )));
//!
//! let job = ExportJob::new(
//!     ExportFilter::new(CollectionId::new("contact")?),
//!     "delimited",
//!     ExportOptions::default(),
//!     500,
//!     "/tmp/quarry",
//! );
//! let summary = ExportRunner::new(exporter, state).run(job).await?;
//! println!("Exported {} submissions", summary.records_written);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod download;
pub mod export;
pub mod format;
pub mod state;
