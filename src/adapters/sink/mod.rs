//! File-system write sink
//!
//! Output artifacts are written through [`FileSink`] so the exporter never
//! keeps a handle open between steps: every call opens, writes, flushes and
//! closes. This keeps a job resumable from another process.

pub mod local;

use crate::domain::Result;
use async_trait::async_trait;
use std::path::Path;

pub use local::LocalFileSink;

#[async_trait]
pub trait FileSink: Send + Sync {
    /// Creates or truncates a file and writes `contents`, creating parent
    /// directories as needed
    async fn create(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Appends `contents` and flushes before returning
    async fn append(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Deletes a file; a missing file is not an error
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Recursively deletes a directory; a missing directory is not an error
    async fn delete_dir(&self, path: &Path) -> Result<()>;

    async fn exists(&self, path: &Path) -> bool;

    /// Current size of a file in bytes
    async fn size(&self, path: &Path) -> Result<u64>;

    /// Shrinks a file to `len` bytes
    async fn truncate(&self, path: &Path, len: u64) -> Result<()>;
}
