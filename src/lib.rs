// Quarry - Resumable batch exporter for form submissions
// Copyright (c) 2025 Quarry Contributors
// Licensed under the MIT License

//! # Quarry - Resumable Batch Exporter for Form Submissions
//!
//! Quarry exports large collections of form submissions into a single file,
//! one page at a time, so an export can be interrupted and resumed without
//! holding the whole collection in memory.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Paging** through a collection with a persistent progress cursor
//! - **Formatting** submissions as delimited text, an HTML table or JSON documents
//! - **Packaging** the result and its attachments into a tar.gz or zip archive
//! - **Checkpointing** every step so interrupted jobs can be resumed
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (export, format, archive, state, download)
//! - [`adapters`] - Submission stores and the file sink
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quarry::adapters::sink::LocalFileSink;
//! use quarry::adapters::store::create_source;
//! use quarry::config::load_config;
//! use quarry::core::export::{BatchExporter, ExportRunner};
//! use quarry::core::format::FormatRegistry;
//! use quarry::core::state::{FileCheckpointStorage, StateManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("quarry.toml")?;
//!     let source = create_source(&config.source).await?;
//!
//!     let exporter = BatchExporter::new(
//!         source.query,
//!         source.loader,
//!         Arc::new(LocalFileSink::new()),
//!         Arc::new(FormatRegistry::with_defaults()),
//!     );
//!     let state = Arc::new(StateManager::new_with_storage(Arc::new(
//!         FileCheckpointStorage::new(&config.state.directory),
//!     )));
//!
//!     let summary = ExportRunner::new(exporter, state)
//!         .run(config.build_job()?)
//!         .await?;
//!     println!("Exported {} submissions", summary.records_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Driving the exporter directly
//!
//! [`core::export::BatchExporter`] holds no state between calls. Anything
//! that can keep a [`core::export::ProgressCursor`] can schedule it:
//!
//! ```rust,no_run
//! # use quarry::core::export::{BatchExporter, ExportJob};
//! # async fn example(exporter: BatchExporter, job: ExportJob) -> quarry::domain::Result<()> {
//! let mut cursor = exporter.initialize(&job).await?;
//! loop {
//!     let outcome = exporter.step(&job, cursor).await?;
//!     cursor = outcome.cursor;
//!     if outcome.is_finished() {
//!         break;
//!     }
//! }
//! let artifact = exporter.finalize(&job, cursor).await?;
//! println!("{} ({})", artifact.path.display(), artifact.checksum);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Quarry uses the [`domain::QuarryError`] type for all library errors.
//! Configuration errors are raised by `initialize` before any file exists;
//! failures during a step or finalize leave no partial output once the job
//! is aborted.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
