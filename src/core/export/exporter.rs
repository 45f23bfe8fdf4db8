//! Batch result exporter
//!
//! Drives one export job through `initialize`, repeated `step` calls and
//! `finalize`, with `abort` to reclaim disk space on failure. The exporter
//! keeps no state between calls: everything it needs is in the
//! [`ExportJob`], the [`ProgressCursor`] handed back by the caller, and the
//! files in the job's working directory.
//!
//! Working directory contents while a job runs:
//!
//! ```text
//! <work_dir>/<base>.<ext>       data file (header, rows, footer)
//! <work_dir>/attachments.jsonl  attachment manifest, when attachments are packaged
//! <work_dir>/<base>.tar.gz|zip  archive, created by finalize
//! ```

use super::cursor::{ProgressCursor, StepOutcome};
use super::job::ExportJob;
use crate::adapters::sink::FileSink;
use crate::adapters::store::{SubmissionLoader, SubmissionQuery};
use crate::core::archive::{create_archive_writer, ArchiveKind};
use crate::core::format::{ArchiveLayout, ColumnSet, FormatRegistry, RecordFormatter};
use crate::domain::ids::SubmissionId;
use crate::domain::submission::Submission;
use crate::domain::{QuarryError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// One attachment queued for packaging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentEntry {
    pub sid: SubmissionId,
    pub element: String,
    pub file_name: String,
    pub path: PathBuf,
}

/// Byte lengths of the job's append-only files after a completed step
///
/// A resumed job truncates its files back to the mark of its last
/// checkpoint, dropping anything a crashed step appended afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMark {
    pub data_len: u64,
    pub manifest_len: u64,
}

/// The deliverable produced by a finished job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportArtifact {
    /// File handed to the requester: the archive, or the data file
    pub path: PathBuf,

    pub archive: ArchiveKind,

    /// Standalone data file kept next to the archive
    pub data_file: Option<PathBuf>,

    /// Data rows or documents written
    pub record_count: u64,

    /// Attachment files packaged into the archive
    pub attachment_count: usize,

    pub size_bytes: u64,

    /// Hex-encoded SHA-256 of the delivered file
    pub checksum: String,
}

/// Paginated, resumable exporter
///
/// Collaborators are passed in explicitly; the exporter is cheap to clone
/// and can drive any number of independent jobs.
#[derive(Clone)]
pub struct BatchExporter {
    query: Arc<dyn SubmissionQuery>,
    loader: Arc<dyn SubmissionLoader>,
    sink: Arc<dyn FileSink>,
    formats: Arc<FormatRegistry>,
}

/// Per-call view of a job: formatter, columns and file paths
struct Plan {
    formatter: Arc<dyn RecordFormatter>,
    columns: ColumnSet,
    data_path: PathBuf,
}

impl BatchExporter {
    pub fn new(
        query: Arc<dyn SubmissionQuery>,
        loader: Arc<dyn SubmissionLoader>,
        sink: Arc<dyn FileSink>,
        formats: Arc<FormatRegistry>,
    ) -> Self {
        Self {
            query,
            loader,
            sink,
            formats,
        }
    }

    pub fn sink(&self) -> &Arc<dyn FileSink> {
        &self.sink
    }

    /// Resolves the format and column layout, checking that the collection
    /// may be exported
    async fn plan(&self, job: &ExportJob) -> Result<Plan> {
        let collection = self.query.collection(&job.filter.collection_id).await?;
        if !collection.export_enabled {
            return Err(QuarryError::Configuration(format!(
                "Export is disabled for collection '{}'",
                collection.id
            )));
        }

        let formatter = self.formats.create(&job.format, &job.options)?;
        let data_path = job.data_file_path(formatter.extension());
        Ok(Plan {
            columns: ColumnSet::build(&collection, &job.options),
            formatter,
            data_path,
        })
    }

    /// Creates the data file with its header and counts the records
    ///
    /// # Errors
    ///
    /// Returns a configuration error, before any file is created, if the job
    /// is invalid, the format is unknown or export is disabled for the
    /// collection.
    pub async fn initialize(&self, job: &ExportJob) -> Result<ProgressCursor> {
        job.validate()?;
        let plan = self.plan(job).await?;
        let total = self.query.count(&job.filter).await?;

        let header = plan.formatter.header(&plan.columns)?;
        self.sink.create(&plan.data_path, &header).await?;
        if job.options.include_attachments {
            self.sink.create(&job.manifest_path(), &[]).await?;
        }

        crate::log_export_start!(&job.id, &job.filter.collection_id, plan.formatter.id());
        info!(
            job_id = %job.id,
            total,
            batch_limit = job.batch_limit,
            path = %plan.data_path.display(),
            "Export initialized"
        );

        Ok(ProgressCursor::start(total))
    }

    /// Exports the next page
    ///
    /// The page starts after the cursor's last submission ID, so records
    /// inserted or deleted between steps neither shift nor repeat earlier
    /// pages. It is serialized completely in memory and appended with a
    /// single write, so the data file only ever grows by whole records.
    /// Records that vanished since the page was selected are skipped.
    pub async fn step(&self, job: &ExportJob, cursor: ProgressCursor) -> Result<StepOutcome> {
        let plan = self.plan(job).await?;
        let ids = self
            .query
            .page(&job.filter, cursor.last_sid, job.batch_limit)
            .await?;

        if ids.is_empty() {
            if !cursor.is_exhausted() {
                warn!(
                    job_id = %job.id,
                    processed = cursor.processed_count,
                    total = cursor.total_count,
                    "Empty page before reaching the initial count, finishing early"
                );
            }
            return Ok(StepOutcome {
                cursor,
                finished: 1.0,
                written: 0,
            });
        }

        let records = self.loader.load_multiple(&ids).await?;
        if records.len() < ids.len() {
            let missing = QuarryError::DataInconsistency(format!(
                "{} of {} submissions vanished before loading",
                ids.len() - records.len(),
                ids.len()
            ));
            warn!(job_id = %job.id, offset = cursor.offset, "{missing}");
        }

        let mut rows = Vec::new();
        let mut manifest = Vec::new();
        for record in &records {
            rows.extend(plan.formatter.record(&plan.columns, record)?);
            if job.options.include_attachments {
                append_manifest_lines(&mut manifest, &plan.columns, record)?;
            }
        }

        if !rows.is_empty() {
            self.sink.append(&plan.data_path, &rows).await?;
        }
        if !manifest.is_empty() {
            self.sink.append(&job.manifest_path(), &manifest).await?;
        }

        let next = cursor.advance(&ids, records.len());
        let finished = if ids.len() < job.batch_limit || next.is_exhausted() {
            1.0
        } else {
            next.fraction()
        };

        crate::log_step_progress!(&job.id, next, records.len());

        Ok(StepOutcome {
            cursor: next,
            finished,
            written: records.len(),
        })
    }

    /// Writes the footer and packages the archive, if one was requested
    pub async fn finalize(&self, job: &ExportJob, cursor: ProgressCursor) -> Result<ExportArtifact> {
        let plan = self.plan(job).await?;

        let footer = plan.formatter.footer(&plan.columns)?;
        if !footer.is_empty() {
            self.sink.append(&plan.data_path, &footer).await?;
        }

        let Some(archive_path) = job.archive_path() else {
            let (checksum, size_bytes) = sha256_file(&plan.data_path).await?;
            info!(job_id = %job.id, path = %plan.data_path.display(), "Export finalized");
            return Ok(ExportArtifact {
                path: plan.data_path,
                archive: ArchiveKind::None,
                data_file: None,
                record_count: cursor.processed_count,
                attachment_count: 0,
                size_bytes,
                checksum,
            });
        };

        let attachments = if job.options.include_attachments {
            read_manifest(&job.manifest_path()).await?
        } else {
            Vec::new()
        };
        let attachment_count = attachments.len();

        let package = ArchivePackage {
            kind: job.options.archive,
            archive_path: archive_path.clone(),
            data_path: plan.data_path.clone(),
            base_name: job.base_name.clone(),
            extension: plan.formatter.extension(),
            formatter: plan.formatter.clone(),
            attachments,
        };
        let entries = tokio::task::spawn_blocking(move || package.build())
            .await
            .map_err(|e| QuarryError::Archive(format!("Archive task failed: {e}")))??;

        if job.options.include_attachments {
            self.sink.delete(&job.manifest_path()).await?;
        }
        let data_file = if job.options.keep_data_file {
            Some(plan.data_path)
        } else {
            self.sink.delete(&plan.data_path).await?;
            None
        };

        let (checksum, size_bytes) = sha256_file(&archive_path).await?;
        info!(
            job_id = %job.id,
            path = %archive_path.display(),
            entries,
            attachments = attachment_count,
            "Export archive created"
        );

        Ok(ExportArtifact {
            path: archive_path,
            archive: job.options.archive,
            data_file,
            record_count: cursor.processed_count,
            attachment_count,
            size_bytes,
            checksum,
        })
    }

    /// Deletes every file of the job, including a partial archive
    pub async fn abort(&self, job: &ExportJob) -> Result<()> {
        warn!(job_id = %job.id, work_dir = %job.work_dir.display(), "Aborting export");
        self.sink.delete_dir(&job.work_dir).await
    }

    /// Current lengths of the job's append-only files
    pub async fn mark(&self, job: &ExportJob) -> Result<OutputMark> {
        let formatter = self.formats.create(&job.format, &job.options)?;
        let data_len = self
            .sink
            .size(&job.data_file_path(formatter.extension()))
            .await?;
        let manifest_len = if job.options.include_attachments {
            self.sink.size(&job.manifest_path()).await?
        } else {
            0
        };
        Ok(OutputMark {
            data_len,
            manifest_len,
        })
    }

    /// Truncates the job's files back to a previously recorded mark
    ///
    /// # Errors
    ///
    /// Returns a state error if a file is shorter than the mark, which means
    /// output recorded by the checkpoint has been lost.
    pub async fn rewind(&self, job: &ExportJob, mark: OutputMark) -> Result<()> {
        let formatter = self.formats.create(&job.format, &job.options)?;
        let data_path = job.data_file_path(formatter.extension());
        self.rewind_file(&data_path, mark.data_len).await?;
        if job.options.include_attachments {
            self.rewind_file(&job.manifest_path(), mark.manifest_len)
                .await?;
        }
        Ok(())
    }

    async fn rewind_file(&self, path: &Path, len: u64) -> Result<()> {
        let current = self.sink.size(path).await?;
        if current < len {
            return Err(QuarryError::State(format!(
                "{} is shorter ({current} bytes) than its checkpoint ({len} bytes)",
                path.display()
            )));
        }
        if current > len {
            debug!(path = %path.display(), from = current, to = len, "Discarding unrecorded output");
            self.sink.truncate(path, len).await?;
        }
        Ok(())
    }
}

fn append_manifest_lines(
    manifest: &mut Vec<u8>,
    columns: &ColumnSet,
    record: &Submission,
) -> Result<()> {
    for attachment in &record.attachments {
        if columns.is_excluded(&attachment.element) {
            continue;
        }
        let entry = AttachmentEntry {
            sid: record.sid,
            element: attachment.element.clone(),
            file_name: attachment.file_name.clone(),
            path: attachment.path.clone(),
        };
        serde_json::to_writer(&mut *manifest, &entry)?;
        manifest.push(b'\n');
    }
    Ok(())
}

async fn read_manifest(path: &Path) -> Result<Vec<AttachmentEntry>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| QuarryError::Io(format!("Failed to read {}: {e}", path.display())))?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(QuarryError::from))
        .collect()
}

/// Everything the blocking archive build needs, owned
struct ArchivePackage {
    kind: ArchiveKind,
    archive_path: PathBuf,
    data_path: PathBuf,
    base_name: String,
    extension: &'static str,
    formatter: Arc<dyn RecordFormatter>,
    attachments: Vec<AttachmentEntry>,
}

impl ArchivePackage {
    /// Writes the archive and returns its entry count
    fn build(self) -> Result<usize> {
        let mut writer = create_archive_writer(self.kind, &self.archive_path)?;
        let base = &self.base_name;
        let mut used = HashSet::new();

        match self.formatter.layout() {
            ArchiveLayout::DataFile => {
                writer.add_file(&format!("{base}/{base}.{}", self.extension), &self.data_path)?;
            }
            ArchiveLayout::DocumentPerRecord => {
                let file = std::fs::File::open(&self.data_path)?;
                for line in std::io::BufReader::new(file).lines() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let (sid, document) = self.formatter.archive_document(line.as_bytes())?;
                    let dir = sid.directory_name();
                    let name = format!("{base}/{dir}/{dir}.json");
                    writer.add_bytes(&name, &document)?;
                    used.insert(name);
                }
            }
        }

        for attachment in &self.attachments {
            let dir = format!("{base}/{}", attachment.sid.directory_name());
            let file_name = safe_file_name(&attachment.file_name)?;
            let name = unique_entry_name(&mut used, &dir, &attachment.element, file_name);
            writer.add_file(&name, &attachment.path)?;
        }

        let entries = writer.entry_count();
        writer.finish()?;
        Ok(entries)
    }
}

/// Claims the first free entry name for an attachment: the plain file name,
/// then `<element>-<name>`, then `<element>-<n>-<name>` counting up from 2
fn unique_entry_name(
    used: &mut HashSet<String>,
    dir: &str,
    element: &str,
    file_name: &str,
) -> String {
    let mut name = format!("{dir}/{file_name}");
    if used.insert(name.clone()) {
        return name;
    }
    name = format!("{dir}/{element}-{file_name}");
    let mut n = 2u32;
    while !used.insert(name.clone()) {
        name = format!("{dir}/{element}-{n}-{file_name}");
        n += 1;
    }
    name
}

/// Last path component of an uploaded file name
fn safe_file_name(file_name: &str) -> Result<&str> {
    file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .ok_or_else(|| QuarryError::Archive(format!("Invalid attachment file name '{file_name}'")))
}

/// SHA-256 and size of a file, read in chunks
pub async fn sha256_file(path: &Path) -> Result<(String, u64)> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| QuarryError::Io(format!("Failed to open {}: {e}", path.display())))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    let mut size = 0u64;

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }

    Ok((format!("{:x}", hasher.finalize()), size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sink::LocalFileSink;
    use crate::adapters::store::MemoryStore;
    use crate::core::export::job::{ExportFilter, ExportOptions};
    use crate::domain::collection::{Collection, Element};
    use crate::domain::ids::CollectionId;
    use crate::domain::submission::SubmissionBuilder;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;

    fn contact() -> CollectionId {
        CollectionId::new("contact").unwrap()
    }

    fn exporter(count: u64) -> (BatchExporter, Arc<MemoryStore>) {
        let store = Arc::new(
            MemoryStore::new()
                .with_collection(
                    Collection::new(contact(), "Contact").with_element(Element::text("name", "Name")),
                )
                .with_submissions((1..=count).map(|sid| {
                    SubmissionBuilder::new()
                        .sid(sid)
                        .collection_id(contact())
                        .created(Utc::now())
                        .value("name", json!(format!("n{sid}")))
                        .build()
                        .unwrap()
                })),
        );
        let exporter = BatchExporter::new(
            store.clone(),
            store.clone(),
            Arc::new(LocalFileSink),
            Arc::new(FormatRegistry::with_defaults()),
        );
        (exporter, store)
    }

    fn job(dir: &Path, batch_limit: usize) -> ExportJob {
        let options = ExportOptions {
            excluded_columns: crate::core::format::MetaField::ALL
                .iter()
                .filter(|m| m.key() != "sid")
                .map(|m| m.key().to_string())
                .collect(),
            ..ExportOptions::default()
        };
        ExportJob::new(ExportFilter::new(contact()), "delimited", options, batch_limit, dir)
    }

    #[tokio::test]
    async fn test_full_run_without_archive() {
        let dir = TempDir::new().unwrap();
        let (exporter, _) = exporter(3);
        let job = job(dir.path(), 2);

        let mut cursor = exporter.initialize(&job).await.unwrap();
        assert_eq!(cursor.total_count, 3);
        loop {
            let outcome = exporter.step(&job, cursor).await.unwrap();
            cursor = outcome.cursor;
            if outcome.is_finished() {
                break;
            }
        }
        let artifact = exporter.finalize(&job, cursor).await.unwrap();

        assert_eq!(artifact.record_count, 3);
        assert_eq!(artifact.checksum.len(), 64);
        assert_eq!(
            std::fs::read_to_string(&artifact.path).unwrap(),
            "Submission ID,Name\n1,n1\n2,n2\n3,n3\n"
        );
    }

    #[tokio::test]
    async fn test_deleted_record_shortens_page() {
        let dir = TempDir::new().unwrap();
        let (exporter, store) = exporter(4);
        let job = job(dir.path(), 10);

        let cursor = exporter.initialize(&job).await.unwrap();
        store.remove_submission(SubmissionId::new(2)).await;
        let outcome = exporter.step(&job, cursor).await.unwrap();

        assert_eq!(outcome.written, 3);
        assert_eq!(outcome.finished, 1.0);
        assert_eq!(outcome.cursor.total_count, 4);
    }

    #[tokio::test]
    async fn test_mark_and_rewind() {
        let dir = TempDir::new().unwrap();
        let (exporter, _) = exporter(4);
        let job = job(dir.path(), 2);

        let cursor = exporter.initialize(&job).await.unwrap();
        let first = exporter.step(&job, cursor).await.unwrap();
        let mark = exporter.mark(&job).await.unwrap();
        exporter.step(&job, first.cursor).await.unwrap();

        exporter.rewind(&job, mark).await.unwrap();
        let data = std::fs::read_to_string(job.data_file_path("csv")).unwrap();
        assert_eq!(data, "Submission ID,Name\n1,n1\n2,n2\n");

        let too_long = OutputMark {
            data_len: mark.data_len + 100,
            manifest_len: 0,
        };
        assert!(matches!(
            exporter.rewind(&job, too_long).await,
            Err(QuarryError::State(_))
        ));
    }

    #[tokio::test]
    async fn test_abort_removes_work_dir() {
        let dir = TempDir::new().unwrap();
        let (exporter, _) = exporter(1);
        let job = job(dir.path(), 2);

        exporter.initialize(&job).await.unwrap();
        assert!(job.work_dir.exists());
        exporter.abort(&job).await.unwrap();
        assert!(!job.work_dir.exists());
    }

    #[test]
    fn test_unique_entry_name() {
        let mut used = HashSet::new();
        used.insert("c/submission-1/submission-1.json".to_string());

        let names: Vec<String> = (0..3)
            .map(|_| unique_entry_name(&mut used, "c/submission-1", "photo", "p.jpg"))
            .collect();
        assert_eq!(
            names,
            vec![
                "c/submission-1/p.jpg",
                "c/submission-1/photo-p.jpg",
                "c/submission-1/photo-2-p.jpg",
            ]
        );
        assert_eq!(
            unique_entry_name(&mut used, "c/submission-1", "cv", "submission-1.json"),
            "c/submission-1/cv-submission-1.json"
        );
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("cv.pdf").unwrap(), "cv.pdf");
        assert_eq!(safe_file_name("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(safe_file_name("C:\\docs\\cv.pdf").unwrap(), "cv.pdf");
        assert!(safe_file_name("uploads/").is_err());
        assert!(safe_file_name("..").is_err());
    }
}
