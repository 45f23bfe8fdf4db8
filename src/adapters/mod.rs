//! External collaborators of the exporter
//!
//! - [`store`] - submission query and materializer implementations
//! - [`sink`] - file-system write sink
//!
//! Collaborators are trait objects passed to the exporter explicitly, so
//! tests can substitute in-memory or failure-injecting versions.

pub mod sink;
pub mod store;
