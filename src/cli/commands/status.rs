//! Status command implementation
//!
//! This module implements the `status` command, which lists the
//! checkpoints of past and running export jobs.

use crate::config::load_config;
use crate::core::state::{FileCheckpointStorage, JobStatus, StateManager};
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Filter by collection
    #[arg(long)]
    pub collection: Option<String>,

    /// Only show jobs that can be resumed
    #[arg(long)]
    pub resumable: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        println!("📊 Export Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let state_manager = StateManager::new_with_storage(Arc::new(FileCheckpointStorage::new(
            &config.state.directory,
        )));

        let checkpoints = match state_manager.list_checkpoints().await {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load checkpoints");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        if checkpoints.is_empty() {
            println!("No export history found.");
            println!("Run 'quarry export' to start exporting submissions.");
            return Ok(0);
        }

        let filtered: Vec<_> = checkpoints
            .iter()
            .filter(|c| {
                self.collection
                    .as_deref()
                    .map_or(true, |id| c.job.filter.collection_id.as_str() == id)
            })
            .filter(|c| !self.resumable || c.is_resumable())
            .collect();

        if filtered.is_empty() {
            println!("No jobs match the specified filters.");
            return Ok(0);
        }

        println!("Found {} job(s):", filtered.len());
        println!();
        println!(
            "{:<38} {:<20} {:<10} {:<16} {:<12} {:<20}",
            "Job ID", "Collection", "Format", "Status", "Progress", "Updated"
        );
        println!("{}", "-".repeat(120));

        for checkpoint in filtered {
            let status = match checkpoint.status {
                JobStatus::Completed => "✅ Completed",
                JobStatus::InProgress => "🔄 In Progress",
                JobStatus::Interrupted => "⏸️  Interrupted",
                JobStatus::Failed => "❌ Failed",
                JobStatus::Aborted => "🗑️  Aborted",
                JobStatus::Pending => "⏳ Pending",
            };
            let progress = format!(
                "{}/{}",
                checkpoint.cursor.processed_count, checkpoint.cursor.total_count
            );

            println!(
                "{:<38} {:<20} {:<10} {:<16} {:<12} {:<20}",
                checkpoint.job.id,
                checkpoint.job.filter.collection_id,
                checkpoint.job.format,
                status,
                progress,
                checkpoint.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
            if let Some(error) = &checkpoint.error {
                println!("    Error: {error}");
            }
        }

        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_defaults() {
        let args = StatusArgs {
            collection: None,
            resumable: false,
        };

        assert!(args.collection.is_none());
        assert!(!args.resumable);
    }
}
