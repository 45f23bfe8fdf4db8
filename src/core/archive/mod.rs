//! Archive packaging
//!
//! Finished output artifacts can be bundled into a single compressed
//! container together with the attachment files they reference. Two
//! interchangeable container formats are supported:
//!
//! - [`ArchiveKind::Tar`] - gzip-compressed tape archive (`.tar.gz`)
//! - [`ArchiveKind::Zip`] - zip archive (`.zip`)
//!
//! Writers are synchronous; async callers run them on a blocking thread.

pub mod tar;
pub mod zip;

use crate::domain::{QuarryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub use self::tar::TarGzArchiveWriter;
pub use self::zip::ZipArchiveWriter;

/// Container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    /// No archive; the data file is delivered directly
    #[default]
    None,
    Tar,
    Zip,
}

impl ArchiveKind {
    /// File extension, or `None` when no archive is produced
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ArchiveKind::None => None,
            ArchiveKind::Tar => Some("tar.gz"),
            ArchiveKind::Zip => Some("zip"),
        }
    }

    pub fn is_archive(&self) -> bool {
        *self != ArchiveKind::None
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArchiveKind::None => "none",
            ArchiveKind::Tar => "tar",
            ArchiveKind::Zip => "zip",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ArchiveKind {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(ArchiveKind::None),
            "tar" | "tar.gz" | "tgz" => Ok(ArchiveKind::Tar),
            "zip" => Ok(ArchiveKind::Zip),
            _ => Err(QuarryError::Configuration(format!(
                "Invalid archive type '{s}'. Must be one of: none, tar, zip"
            ))),
        }
    }
}

/// Writer adding named entries to a compressed container
pub trait ArchiveWriter: Send {
    /// Adds the contents of a file on disk under `name`
    fn add_file(&mut self, name: &str, source: &Path) -> Result<()>;

    /// Adds in-memory contents under `name`
    fn add_bytes(&mut self, name: &str, data: &[u8]) -> Result<()>;

    /// Number of entries added so far
    fn entry_count(&self) -> usize;

    /// Writes the trailer and flushes the container to disk
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Creates a writer for `kind` at `path`
///
/// # Errors
///
/// Returns a configuration error for [`ArchiveKind::None`] and an I/O error
/// if the destination cannot be created.
pub fn create_archive_writer(kind: ArchiveKind, path: &Path) -> Result<Box<dyn ArchiveWriter>> {
    match kind {
        ArchiveKind::Tar => Ok(Box::new(TarGzArchiveWriter::create(path)?)),
        ArchiveKind::Zip => Ok(Box::new(ZipArchiveWriter::create(path)?)),
        ArchiveKind::None => Err(QuarryError::Configuration(
            "Cannot create an archive writer for archive type 'none'".to_string(),
        )),
    }
}

/// Lists the entry names of an existing archive, in stored order
pub fn entry_names(kind: ArchiveKind, path: &Path) -> Result<Vec<String>> {
    match kind {
        ArchiveKind::Tar => self::tar::entry_names(path),
        ArchiveKind::Zip => self::zip::entry_names(path),
        ArchiveKind::None => Ok(Vec::new()),
    }
}

/// Rejects entry names that would escape the archive root
pub(crate) fn check_entry_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('/')
        || name.split('/').any(|part| part == "..")
    {
        return Err(QuarryError::Archive(format!("Invalid entry name '{name}'")));
    }
    Ok(())
}
