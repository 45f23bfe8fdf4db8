//! Export command implementation
//!
//! This module implements the `export` command, which runs a new export job
//! or resumes an interrupted one and delivers the result to the output
//! directory.

use crate::adapters::sink::{FileSink, LocalFileSink};
use crate::adapters::store::create_source;
use crate::config::{load_config, QuarryConfig};
use crate::core::archive::ArchiveKind;
use crate::core::download::DownloadRegistry;
use crate::core::export::{BatchExporter, ExportRunner, ExportSummary};
use crate::core::format::FormatRegistry;
use crate::core::state::{FileCheckpointStorage, StateManager};
use crate::domain::ids::JobId;
use crate::domain::QuarryError;
use clap::Args;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Resume an interrupted job instead of starting a new one
    #[arg(long, value_name = "JOB_ID")]
    pub resume: Option<String>,

    /// Override the collection to export
    #[arg(long)]
    pub collection: Option<String>,

    /// Override the format (delimited, table, json)
    #[arg(long)]
    pub format: Option<String>,

    /// Override the number of submissions per step
    #[arg(long)]
    pub batch_limit: Option<usize>,

    /// Override the archive type (none, tar, zip)
    #[arg(long)]
    pub archive: Option<String>,

    /// Override the output directory
    #[arg(long)]
    pub output_dir: Option<String>,
}

/// Maps a failed run to the documented exit codes
fn exit_code_for(error: &QuarryError) -> i32 {
    match error {
        QuarryError::Configuration(_) | QuarryError::Validation(_) => 2,
        QuarryError::Source(_) => 4,
        _ => 1,
    }
}

impl ExportArgs {
    fn apply_overrides(&self, config: &mut QuarryConfig) -> Result<(), QuarryError> {
        if let Some(collection) = &self.collection {
            tracing::info!(collection = %collection, "Overriding collection from CLI");
            config.export.collection = collection.clone();
        }
        if let Some(format) = &self.format {
            tracing::info!(format = %format, "Overriding format from CLI");
            config.export.format = format.clone();
        }
        if let Some(batch_limit) = self.batch_limit {
            config.export.batch_limit = batch_limit;
        }
        if let Some(archive) = &self.archive {
            config.archive.kind = ArchiveKind::from_str(archive)?;
        }
        if let Some(output_dir) = &self.output_dir {
            config.export.output_dir = output_dir.into();
        }
        Ok(())
    }

    fn confirm(config: &QuarryConfig) -> anyhow::Result<bool> {
        use std::io::{self, Write};

        println!("Export Configuration:");
        println!("  Collection: {}", config.export.collection);
        println!("  Format: {}", config.export.format);
        println!("  Range: {:?}", config.export.range);
        println!("  Batch limit: {}", config.export.batch_limit);
        println!("  Archive: {}", config.archive.kind);
        println!("  Output: {}", config.export.output_dir.display());
        println!();
        print!("Proceed with export? [y/N]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().eq_ignore_ascii_case("y"))
    }

    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = self.apply_overrides(&mut config) {
            eprintln!("{e}");
            return Ok(2);
        }
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        let resume = match self.resume.as_deref().map(JobId::from_str).transpose() {
            Ok(resume) => resume,
            Err(e) => {
                eprintln!("{e}");
                return Ok(2);
            }
        };

        if resume.is_none() && !self.yes && !Self::confirm(&config)? {
            println!("Export cancelled.");
            return Ok(0);
        }

        let source = match create_source(&config.source).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open submission source");
                eprintln!("Failed to open submission source: {e}");
                return Ok(4);
            }
        };

        let sink: Arc<dyn FileSink> = Arc::new(LocalFileSink::new());
        let exporter = BatchExporter::new(
            source.query,
            source.loader,
            sink.clone(),
            Arc::new(FormatRegistry::with_defaults()),
        );
        let state = Arc::new(StateManager::new_with_storage(Arc::new(
            FileCheckpointStorage::new(&config.state.directory),
        )));
        let runner = ExportRunner::new(exporter, state.clone()).with_shutdown_signal(shutdown_signal);

        println!("🚀 Starting export...");
        println!();

        let result = match resume {
            Some(job_id) => runner.resume(&job_id).await,
            None => match config.build_job() {
                Ok(job) => runner.run(job).await,
                Err(e) => Err(e),
            },
        };

        let summary = match result {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                eprintln!("Export failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        summary.log_summary();
        Self::print_summary(&summary);

        if summary.interrupted {
            println!("⚠️  Export interrupted gracefully. Progress saved.");
            println!("   Resume with: quarry export --resume {}", summary.job_id);
            println!();
            tracing::info!(job_id = %summary.job_id, "Export interrupted by user signal");
            return Ok(130);
        }

        let checkpoint = state
            .load_checkpoint(&summary.job_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Checkpoint for job {} disappeared", summary.job_id))?;

        let downloads = DownloadRegistry::new(sink);
        let delivered = match downloads.issue(&checkpoint).await {
            Ok(token) => downloads.deliver(token, &config.export.output_dir).await,
            Err(e) => Err(e),
        };

        match delivered {
            Ok(path) => {
                println!("✅ Export delivered to {}", path.display());
                Ok(0)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to deliver export");
                eprintln!("Failed to deliver export: {e}");
                Ok(1)
            }
        }
    }

    fn print_summary(summary: &ExportSummary) {
        println!();
        println!("📊 Export Summary:");
        println!("  Job: {}", summary.job_id);
        println!("  Collection: {}", summary.collection_id);
        println!("  Format: {}", summary.format);
        println!("  Counted: {}", summary.total_count);
        println!("  Written: {}", summary.records_written);
        println!("  Steps: {}", summary.steps);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        if let Some(artifact) = &summary.artifact {
            println!("  Size: {} bytes", artifact.size_bytes);
            println!("  SHA-256: {}", artifact.checksum);
            if artifact.attachment_count > 0 {
                println!("  Attachments: {}", artifact.attachment_count);
            }
        }
        println!();

        if !summary.errors.is_empty() {
            println!("⚠️  Errors encountered:");
            for error in &summary.errors {
                println!("  - {:?}: {}", error.error_type, error.message);
                if let Some(context) = &error.context {
                    println!("    Context: {context}");
                }
            }
            println!();
        }
    }
}
