//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::QuarryConfig;
use crate::core::archive::ArchiveKind;
use crate::domain::{QuarryError, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`QuarryConfig`]
/// 4. Applies environment variable overrides (`QUARRY_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns a configuration error if the file cannot be read or parsed, a
/// referenced environment variable is not set, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use quarry::config::loader::load_config;
///
/// let config = load_config("quarry.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<QuarryConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(QuarryError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        QuarryError::Configuration(format!(
            "Failed to read configuration file {}: {e}",
            path.display()
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: QuarryConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        QuarryError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied unchanged.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| QuarryError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                if !missing_vars.iter().any(|v| v == var_name) {
                    missing_vars.push(var_name.to_string());
                }
                String::new()
            })
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(QuarryError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        QuarryError::Configuration(format!("Invalid value '{value}' for {name}"))
    })
}

/// Applies environment variable overrides using the `QUARRY_*` prefix
///
/// Variables follow the pattern `QUARRY_<SECTION>_<KEY>`, for example
/// `QUARRY_EXPORT_BATCH_LIMIT` or `QUARRY_ARCHIVE_TYPE`.
fn apply_env_overrides(config: &mut QuarryConfig) -> Result<()> {
    let var = |name: &str| std::env::var(name).ok();

    if let Some(val) = var("QUARRY_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Some(val) = var("QUARRY_SOURCE_DIRECTORY") {
        config.source.directory = PathBuf::from(val);
    }

    if let Some(val) = var("QUARRY_EXPORT_COLLECTION") {
        config.export.collection = val;
    }
    if let Some(val) = var("QUARRY_EXPORT_FORMAT") {
        config.export.format = val;
    }
    if let Some(val) = var("QUARRY_EXPORT_BATCH_LIMIT") {
        config.export.batch_limit = parse_env("QUARRY_EXPORT_BATCH_LIMIT", &val)?;
    }
    if let Some(val) = var("QUARRY_EXPORT_TEMP_DIR") {
        config.export.temp_dir = PathBuf::from(val);
    }
    if let Some(val) = var("QUARRY_EXPORT_OUTPUT_DIR") {
        config.export.output_dir = PathBuf::from(val);
    }

    if let Some(val) = var("QUARRY_ARCHIVE_TYPE") {
        config.archive.kind = ArchiveKind::from_str(&val)?;
    }
    if let Some(val) = var("QUARRY_ARCHIVE_INCLUDE_ATTACHMENTS") {
        config.archive.include_attachments =
            parse_env("QUARRY_ARCHIVE_INCLUDE_ATTACHMENTS", &val)?;
    }

    if let Some(val) = var("QUARRY_STATE_DIRECTORY") {
        config.state.directory = PathBuf::from(val);
    }

    if let Some(val) = var("QUARRY_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_env("QUARRY_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = var("QUARRY_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("QUARRY_TEST_SOURCE_DIR", "/srv/forms");
        let input = "# ${NOT_SUBSTITUTED}\ndirectory = \"${QUARRY_TEST_SOURCE_DIR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(
            result,
            "# ${NOT_SUBSTITUTED}\ndirectory = \"/srv/forms\""
        );
        std::env::remove_var("QUARRY_TEST_SOURCE_DIR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("QUARRY_TEST_MISSING_VAR");
        let input = "directory = \"${QUARRY_TEST_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("QUARRY_TEST_MISSING_VAR"));
    }

    #[test]
    fn test_parse_env() {
        assert_eq!(parse_env::<usize>("X", " 25 ").unwrap(), 25);
        assert!(parse_env::<bool>("X", "maybe").is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[source]
directory = "./data"

[export]
collection = "contact"
format = "table"
batch_limit = 100

[archive]
type = "tar"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.application.log_level, "debug");
        assert_eq!(config.export.format, "table");
        assert_eq!(config.archive.kind, ArchiveKind::Tar);
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[source]\ndirectory = \"d\"\n\n[export]\ncollection = \"contact\"\nbatch_limit = 0\n")
            .unwrap();
        temp_file.flush().unwrap();

        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("batch_limit"));
    }
}
