//! Configuration file management.
//!
//! Optional TOML configuration for export and download settings. CLI
//! flags always override file values.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::{AppError, Result};

use super::media_fetcher::DownloadPolicy;

/// Default configuration file content, written nowhere but documented
/// here and used by tests.
const DEFAULT_CONFIG: &str = r##"# messenger-export configuration

[export]
# Field delimiter for the export file. Must be a single ASCII character
# unlikely to appear in message text.
delimiter = "#"

[downloads]
# Directory receiving downloaded attachments.
files_dir = "files"

# What to do when a download fails: "skip-and-continue" or "fail-fast".
policy = "skip-and-continue"
"##;

/// Export output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub delimiter: char,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { delimiter: '#' }
    }
}

/// Attachment download settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub files_dir: PathBuf,
    pub policy: DownloadPolicy,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            files_dir: PathBuf::from("files"),
            policy: DownloadPolicy::default(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub export: ExportConfig,
    pub downloads: DownloadConfig,
}

impl AppConfig {
    /// The export delimiter as a single byte.
    ///
    /// # Errors
    /// Returns error if the configured delimiter is not ASCII.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.export.delimiter).map_err(|_| AppError::Config {
            message: format!(
                "delimiter must be a single ASCII character, got '{}'",
                self.export.delimiter
            ),
        })
    }
}

/// Load configuration from an optional file path, falling back to
/// defaults when no path is given.
///
/// # Errors
/// Returns error if a given file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config_from_file(path),
        None => Ok(AppConfig::default()),
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if the file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.export.delimiter, '#');
        assert_eq!(config.downloads.files_dir, PathBuf::from("files"));
        assert_eq!(config.downloads.policy, DownloadPolicy::SkipAndContinue);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.delimiter_byte().unwrap(), b'#');
    }

    #[test]
    fn test_fail_fast_policy_parses() {
        let config: AppConfig =
            toml::from_str("[downloads]\npolicy = \"fail-fast\"\n").unwrap();
        assert_eq!(config.downloads.policy, DownloadPolicy::FailFast);
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let config: AppConfig = toml::from_str("[export]\ndelimiter = \"•\"\n").unwrap();
        assert!(config.delimiter_byte().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, DEFAULT_CONFIG).unwrap();

        let loaded = load_config_from_file(&path).unwrap();
        assert_eq!(loaded.export.delimiter, '#');
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_config_from_file(Path::new("/nonexistent/config.toml")).is_err());
    }
}
