//! Configuration management for Quarry.
//!
//! TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `QUARRY_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of every section
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use quarry::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("quarry.toml")?;
//! println!("Exporting {} as {}", config.export.collection, config.export.format);
//! let job = config.build_job()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [source]
//! directory = "${QUARRY_DATA_DIR}"
//!
//! [export]
//! collection = "contact"
//! format = "delimited"
//! batch_limit = 500
//! output_dir = "./exports"
//!
//! [export.range]
//! type = "latest"
//! count = 1000
//!
//! [export.options]
//! delimiter = ","
//! options_format = "separate"
//!
//! [archive]
//! type = "zip"
//! include_attachments = true
//! ```

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, ArchiveConfig, ExportConfig, FormatConfig, LoggingConfig, QuarryConfig,
    SourceConfig, StateConfig,
};
