//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `lamella.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::PathBuf;
use std::time::Duration;

use lamella_app::config::DocumentPaths;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Locations of the two automation documents.
    pub documents: DocumentsConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Document watcher settings.
    pub watcher: WatcherConfig,
}

/// Paths of the shutter and schedule documents.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Shutter/geometry document.
    pub shutters: PathBuf,
    /// Calendar/rules document.
    pub schedule: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Hot-reload watcher configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Watch the documents and reload on change.
    pub enabled: bool,
    /// Quiet window after a change before further changes count again.
    pub debounce_ms: u64,
}

impl Config {
    /// Load configuration from `lamella.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("lamella.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LAMELLA_SHUTTERS") {
            self.documents.shutters = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("LAMELLA_SCHEDULE") {
            self.documents.schedule = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("LAMELLA_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.watcher.debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "watcher debounce must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the document locations in the form the loader expects.
    #[must_use]
    pub fn document_paths(&self) -> DocumentPaths {
        DocumentPaths {
            shutters: self.documents.shutters.clone(),
            schedule: self.documents.schedule.clone(),
        }
    }

    /// Return the watcher debounce window.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watcher.debounce_ms)
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            shutters: PathBuf::from("shutters.toml"),
            schedule: PathBuf::from("schedule.toml"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "lamellad=info,lamella_app=info,lamella_adapter_memory=info".to_string(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 500,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.documents.shutters, Path::new("shutters.toml"));
        assert_eq!(config.documents.schedule, Path::new("schedule.toml"));
        assert!(config.watcher.enabled);
        assert_eq!(config.watcher.debounce_ms, 500);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let toml = "";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.documents.shutters, Path::new("shutters.toml"));
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [documents]
            shutters = '/etc/lamella/shutters.toml'
            schedule = '/etc/lamella/schedule.toml'

            [logging]
            filter = 'debug'

            [watcher]
            enabled = false
            debounce_ms = 250
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.documents.shutters,
            Path::new("/etc/lamella/shutters.toml")
        );
        assert_eq!(
            config.documents.schedule,
            Path::new("/etc/lamella/schedule.toml")
        );
        assert_eq!(config.logging.filter, "debug");
        assert!(!config.watcher.enabled);
        assert_eq!(config.watcher.debounce_ms, 250);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.documents.schedule, Path::new("schedule.toml"));
    }

    #[test]
    fn should_reject_zero_debounce() {
        let mut config = Config::default();
        config.watcher.debounce_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_default_watcher() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_build_document_paths() {
        let mut config = Config::default();
        config.documents.shutters = PathBuf::from("/tmp/s.toml");
        let paths = config.document_paths();
        assert_eq!(paths.shutters, Path::new("/tmp/s.toml"));
        assert_eq!(paths.schedule, Path::new("schedule.toml"));
    }

    #[test]
    fn should_convert_debounce_to_duration() {
        let config = Config::default();
        assert_eq!(config.debounce(), Duration::from_millis(500));
    }

    #[test]
    fn should_parse_partial_toml_with_defaults() {
        let toml = "
            [watcher]
            debounce_ms = 100
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.watcher.debounce_ms, 100);
        assert!(config.watcher.enabled);
        assert_eq!(config.documents.shutters, Path::new("shutters.toml"));
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
