//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Quarry configuration file.

use crate::config::load_config;
use crate::core::format::FormatRegistry;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates every section
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let formats = FormatRegistry::with_defaults();
        if !formats.contains(&config.export.format) {
            println!("❌ Unknown format '{}'", config.export.format);
            println!("   Available formats: {}", formats.ids().join(", "));
            return Ok(2);
        }

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Source Directory: {}", config.source.directory.display());
        println!("  Collection: {}", config.export.collection);
        println!("  Format: {}", config.export.format);
        println!("  Batch Limit: {}", config.export.batch_limit);
        println!("  Range: {:?}", config.export.range);
        println!("  Archive: {}", config.archive.kind);
        println!("  Include Attachments: {}", config.archive.include_attachments);
        println!("  Output Directory: {}", config.export.output_dir.display());
        println!("  State Directory: {}", config.state.directory.display());
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_unknown_format_is_rejected() {
        let file = write(
            "[source]\ndirectory = \"d\"\n\n[export]\ncollection = \"contact\"\nformat = \"xlsx\"\n",
        );
        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_valid_config() {
        let file = write("[source]\ndirectory = \"d\"\n\n[export]\ncollection = \"contact\"\n");
        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 0);
    }
}
