//! Local disk sink

use super::FileSink;
use crate::domain::{QuarryError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Writes output files to the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSink;

impl LocalFileSink {
    pub fn new() -> Self {
        Self
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> QuarryError {
    QuarryError::Io(format!("Failed to {action} {}: {e}", path.display()))
}

#[async_trait]
impl FileSink for LocalFileSink {
    async fn create(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create directory", parent, e))?;
        }

        let mut file = fs::File::create(path)
            .await
            .map_err(|e| io_error("create", path, e))?;
        file.write_all(contents)
            .await
            .map_err(|e| io_error("write", path, e))?;
        file.flush().await.map_err(|e| io_error("flush", path, e))?;
        Ok(())
    }

    async fn append(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .await
            .map_err(|e| io_error("open", path, e))?;
        file.write_all(contents)
            .await
            .map_err(|e| io_error("append to", path, e))?;
        file.flush().await.map_err(|e| io_error("flush", path, e))?;
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete", path, e)),
        }
    }

    async fn delete_dir(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete", path, e)),
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn size(&self, path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| io_error("stat", path, e))?;
        Ok(metadata.len())
    }

    async fn truncate(&self, path: &Path, len: u64) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .await
            .map_err(|e| io_error("open", path, e))?;
        file.set_len(len)
            .await
            .map_err(|e| io_error("truncate", path, e))?;
        file.sync_all().await.map_err(|e| io_error("sync", path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_then_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("job").join("out.csv");
        let sink = LocalFileSink::new();

        sink.create(&path, b"a,b\n").await.unwrap();
        sink.append(&path, b"1,2\n").await.unwrap();
        sink.append(&path, b"3,4\n").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n1,2\n3,4\n");
    }

    #[tokio::test]
    async fn test_append_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let result = LocalFileSink.append(&dir.path().join("missing"), b"x").await;
        assert!(matches!(result, Err(QuarryError::Io(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let sink = LocalFileSink;

        sink.create(&path, b"x").await.unwrap();
        assert!(sink.exists(&path).await);
        sink.delete(&path).await.unwrap();
        sink.delete(&path).await.unwrap();
        assert!(!sink.exists(&path).await);

        sink.delete_dir(&dir.path().join("nothing")).await.unwrap();
    }

    #[tokio::test]
    async fn test_truncate_rewinds_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let sink = LocalFileSink;

        sink.create(&path, b"h\n").await.unwrap();
        let mark = sink.size(&path).await.unwrap();
        sink.append(&path, b"partial").await.unwrap();
        sink.truncate(&path, mark).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"h\n");
    }
}
