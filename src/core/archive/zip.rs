//! Zip archives

use super::{check_entry_name, ArchiveWriter};
use crate::domain::{QuarryError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use ::zip::write::FileOptions;
use ::zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Writes a `.zip` archive with deflate compression
///
/// Every entry carries the zip epoch (1980-01-01) as its modification time,
/// so identical inputs produce identical archives.
pub struct ZipArchiveWriter {
    zip: ZipWriter<BufWriter<File>>,
    options: FileOptions,
    entries: usize,
}

impl ZipArchiveWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| {
            QuarryError::Io(format!("Failed to create archive {}: {e}", path.display()))
        })?;

        Ok(Self {
            zip: ZipWriter::new(BufWriter::new(file)),
            options: FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(::zip::DateTime::default()),
            entries: 0,
        })
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn add_file(&mut self, name: &str, source: &Path) -> Result<()> {
        check_entry_name(name)?;
        let mut file = File::open(source).map_err(|e| {
            QuarryError::Archive(format!("Failed to open {}: {e}", source.display()))
        })?;
        self.zip.start_file(name, self.options)?;
        std::io::copy(&mut file, &mut self.zip)
            .map_err(|e| QuarryError::Archive(format!("Failed to add {name}: {e}")))?;
        self.entries += 1;
        Ok(())
    }

    fn add_bytes(&mut self, name: &str, data: &[u8]) -> Result<()> {
        check_entry_name(name)?;
        self.zip.start_file(name, self.options)?;
        self.zip
            .write_all(data)
            .map_err(|e| QuarryError::Archive(format!("Failed to add {name}: {e}")))?;
        self.entries += 1;
        Ok(())
    }

    fn entry_count(&self) -> usize {
        self.entries
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        let mut writer = self.zip.finish()?;
        writer.flush()?;
        Ok(())
    }
}

pub(super) fn entry_names(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index(i)?.name().to_string());
    }
    Ok(names)
}
