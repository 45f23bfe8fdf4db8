//! Gzip-compressed tar archives

use super::{check_entry_name, ArchiveWriter};
use crate::domain::{QuarryError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Writes a `.tar.gz` archive
pub struct TarGzArchiveWriter {
    builder: ::tar::Builder<GzEncoder<BufWriter<File>>>,
    entries: usize,
}

impl TarGzArchiveWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| {
            QuarryError::Io(format!("Failed to create archive {}: {e}", path.display()))
        })?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        let mut builder = ::tar::Builder::new(encoder);
        builder.mode(::tar::HeaderMode::Deterministic);

        Ok(Self {
            builder,
            entries: 0,
        })
    }
}

impl ArchiveWriter for TarGzArchiveWriter {
    fn add_file(&mut self, name: &str, source: &Path) -> Result<()> {
        check_entry_name(name)?;
        let mut file = File::open(source).map_err(|e| {
            QuarryError::Archive(format!("Failed to open {}: {e}", source.display()))
        })?;
        self.builder
            .append_file(name, &mut file)
            .map_err(|e| QuarryError::Archive(format!("Failed to add {name}: {e}")))?;
        self.entries += 1;
        Ok(())
    }

    fn add_bytes(&mut self, name: &str, data: &[u8]) -> Result<()> {
        check_entry_name(name)?;
        let mut header = ::tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        self.builder
            .append_data(&mut header, name, data)
            .map_err(|e| QuarryError::Archive(format!("Failed to add {name}: {e}")))?;
        self.entries += 1;
        Ok(())
    }

    fn entry_count(&self) -> usize {
        self.entries
    }

    fn finish(self: Box<Self>) -> Result<()> {
        let encoder = self
            .builder
            .into_inner()
            .map_err(|e| QuarryError::Archive(format!("Failed to finish tar: {e}")))?;
        let mut writer = encoder
            .finish()
            .map_err(|e| QuarryError::Archive(format!("Failed to finish gzip stream: {e}")))?;
        std::io::Write::flush(&mut writer)?;
        Ok(())
    }
}

pub(super) fn entry_names(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut archive = ::tar::Archive::new(GzDecoder::new(file));
    let mut names = Vec::new();
    for entry in archive
        .entries()
        .map_err(|e| QuarryError::Archive(e.to_string()))?
    {
        let entry = entry.map_err(|e| QuarryError::Archive(e.to_string()))?;
        let entry_path = entry
            .path()
            .map_err(|e| QuarryError::Archive(e.to_string()))?;
        names.push(entry_path.to_string_lossy().into_owned());
    }
    Ok(names)
}
