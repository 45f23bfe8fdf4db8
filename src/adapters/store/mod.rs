//! Submission sources
//!
//! - [`traits`] - query and materializer interfaces consumed by the exporter
//! - [`memory`] - in-memory store
//! - [`directory`] - store over a directory of JSON files
//! - [`factory`] - builds the configured source

pub mod directory;
pub mod factory;
pub mod memory;
pub mod traits;

pub use directory::DirectoryStore;
pub use factory::{create_source, SourceHandles};
pub use memory::MemoryStore;
pub use traits::{SubmissionLoader, SubmissionQuery};
