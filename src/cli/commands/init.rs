//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "quarry.toml")]
    pub output: String,

    /// Include every option with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Quarry configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(()) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Point [source] directory at your submission data");
                println!("  2. Set the collection to export in [export]");
                println!("  3. Validate configuration: quarry validate-config");
                println!("  4. Run export: quarry export");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Quarry Configuration File

[application]
log_level = "info"

[source]
directory = "./data"

[export]
collection = "contact"
format = "delimited"
batch_limit = 500
output_dir = "./exports"

[archive]
type = "none"

[state]
directory = ".quarry/state"

[logging]
local_enabled = false
"#
        .to_string()
    }

    /// Generate configuration with every option documented
    fn generate_config_with_examples() -> String {
        r#"# Quarry Configuration File
# Resumable batch exporter for form submissions
#
# Values may reference environment variables with ${VAR_NAME}.
# Any key can also be overridden with QUARRY_<SECTION>_<KEY>,
# for example QUARRY_EXPORT_BATCH_LIMIT=1000.

# ============================================================================
# Application
# ============================================================================
[application]
# trace | debug | info | warn | error
log_level = "info"

# ============================================================================
# Submission Source
# ============================================================================
[source]
# One subdirectory per collection holding collection.json and
# submissions.jsonl; relative attachment paths resolve against it
directory = "./data"

# ============================================================================
# Export
# ============================================================================
[export]
collection = "contact"

# delimited | table | json
format = "delimited"

# Submissions exported per step
batch_limit = 500

# Each job works in <temp_dir>/<job_id>/ until it is delivered
# temp_dir = "/tmp/quarry"
output_dir = "./exports"

# Output file name stem (default: <collection>_submissions)
# base_name = "contact_export"

# Only submissions owned by this user id
# owner = 42

# all | completed | draft
state = "all"

# asc | desc (by submission id)
order = "asc"

# Range of submissions: all | latest | sid | serial | date
[export.range]
type = "all"
# type = "latest"
# count = 1000
#
# type = "sid"
# start = 100
# end = 200
#
# type = "date"
# start = "2024-01-01T00:00:00Z"
# end = "2024-12-31T23:59:59Z"

[export.options]
# Field delimiter for delimited text (use "\t" for tab separated)
delimiter = ","

# Separator for several values in one cell
multiple_delimiter = ";"

# label | key
header_format = "label"
options_item_format = "label"

# compact: one cell per element | separate: one column per option or sub-element
options_format = "compact"
composite_format = "compact"

# Columns left out of the output (metadata keys or element keys)
excluded_columns = ["remote_addr", "notes"]

# ============================================================================
# Archive Packaging
# ============================================================================
[archive]
# none | tar | zip
type = "zip"

# Copy uploaded files into submission-<sid>/ directories
include_attachments = true

# Deliver the plain data file next to the archive
keep_data_file = false

# ============================================================================
# Checkpoints
# ============================================================================
[state]
# One JSON checkpoint per job; used by 'quarry status' and '--resume'
directory = ".quarry/state"

# ============================================================================
# Logging
# ============================================================================
[logging]
local_enabled = true
local_path = "./logs"

# daily | hourly | never
local_rotation = "daily"
local_max_files = 7
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuarryConfig;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "quarry.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "quarry.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generated_configs_are_valid() {
        for content in [
            InitArgs::generate_minimal_config(),
            InitArgs::generate_config_with_examples(),
        ] {
            let config: QuarryConfig = toml::from_str(&content).unwrap();
            assert!(config.validate().is_ok());
        }
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("quarry.toml");
        std::fs::write(&output, "existing").unwrap();

        let args = InitArgs {
            output: output.to_string_lossy().into_owned(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "existing");
    }
}
