//! Configuration structures for syncwatch.
//!
//! This module provides configuration types for the two halves of the daemon:
//!
//! - [`WatchConfig`] - what to watch (root directory, include/exclude patterns)
//! - [`TriggerConfig`] - what to run and when (command, debounce, settle)
//! - [`Config`] - root configuration combining both
//!
//! Values normally arrive from the environment (`WATCH_DIR`, `DEBOUNCE_TIME`,
//! ...) through the CLI. [`Config::validate`] must be called before the
//! configuration is handed to the watcher or the engine.

use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Seconds of quiet after the last change before the command fires.
pub const DEFAULT_DEBOUNCE_SECS: f64 = 3.0;

/// Seconds to keep the watch paused after the command completes.
pub const DEFAULT_SETTLE_SECS: f64 = 2.0;

/// Upper bound for both windows: one day.
pub const MAX_WINDOW_SECS: f64 = 86_400.0;

/// Configuration for the watched tree.
///
/// # Examples
///
/// ```
/// use sw_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert!(config.include.is_none());
/// assert!(config.exclude.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Root directory, watched recursively (`WATCH_DIR`).
    pub root: Utf8PathBuf,

    /// Regular expression a path must match to be considered (`WATCH_INCLUDE`).
    ///
    /// `None` admits every path.
    pub include: Option<String>,

    /// Regular expression that rejects a path (`WATCH_EXCLUDE`).
    ///
    /// Exclusion always wins over inclusion.
    pub exclude: Option<String>,
}

/// Configuration for the triggered command.
///
/// # Examples
///
/// ```
/// use sw_core::TriggerConfig;
/// use std::time::Duration;
///
/// let config = TriggerConfig::default();
/// assert_eq!(config.debounce(), Duration::from_secs(3));
/// assert_eq!(config.settle(), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Shell command line executed when a burst of changes settles (`ONCHANGE_CMD`).
    pub command: String,

    /// Debounce window in seconds (`DEBOUNCE_TIME`).
    pub debounce_secs: f64,

    /// Settle window in seconds after the command completes (`ONCHANGE_CMD_TIME`).
    pub settle_secs: f64,
}

impl TriggerConfig {
    /// Returns the debounce window as a [`Duration`].
    ///
    /// Values [`Config::validate`] would reject map to zero.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        seconds(self.debounce_secs)
    }

    /// Returns the settle window as a [`Duration`].
    #[must_use]
    pub fn settle(&self) -> Duration {
        seconds(self.settle_secs)
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            debounce_secs: DEFAULT_DEBOUNCE_SECS,
            settle_secs: DEFAULT_SETTLE_SECS,
        }
    }
}

/// Root configuration for syncwatch.
///
/// # Examples
///
/// ```
/// use sw_core::Config;
///
/// let config = Config::new("/srv/pihole", "sync-configs");
/// assert_eq!(config.watch.root, "/srv/pihole");
/// assert_eq!(config.trigger.command, "sync-configs");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Watched tree configuration.
    pub watch: WatchConfig,

    /// Triggered command configuration.
    pub trigger: TriggerConfig,
}

impl Config {
    /// Creates a configuration with default timings.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>, command: impl Into<String>) -> Self {
        Self {
            watch: WatchConfig {
                root: root.into(),
                ..WatchConfig::default()
            },
            trigger: TriggerConfig {
                command: command.into(),
                ..TriggerConfig::default()
            },
        }
    }

    /// Validates and normalizes the configuration.
    ///
    /// - The root must exist and be a directory; it is replaced by its
    ///   canonical absolute form so patterns see the same strings the
    ///   watcher reports.
    /// - Empty patterns are treated as absent.
    /// - The command must not be blank.
    /// - Durations must be finite, non-negative and at most
    ///   [`MAX_WINDOW_SECS`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let root = &self.watch.root;
        if root.as_str().is_empty() {
            return Err(ConfigError::invalid_option("WATCH_DIR", "must be set"));
        }
        if !root.exists() {
            return Err(ConfigError::MissingDirectory(root.clone()));
        }
        if !root.is_dir() {
            return Err(ConfigError::NotADirectory(root.clone()));
        }
        self.watch.root = root.canonicalize_utf8()?;

        self.watch.include = self.watch.include.filter(|p| !p.is_empty());
        self.watch.exclude = self.watch.exclude.filter(|p| !p.is_empty());

        if self.trigger.command.trim().is_empty() {
            return Err(ConfigError::invalid_option("ONCHANGE_CMD", "must not be empty"));
        }

        check_seconds("DEBOUNCE_TIME", self.trigger.debounce_secs)?;
        check_seconds("ONCHANGE_CMD_TIME", self.trigger.settle_secs)?;

        Ok(self)
    }
}

fn check_seconds(option: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::invalid_option(option, "must be a finite number of seconds"));
    }
    if value < 0.0 {
        return Err(ConfigError::invalid_option(option, "must not be negative"));
    }
    if value > MAX_WINDOW_SECS {
        return Err(ConfigError::invalid_option(
            option,
            format!("must be at most {MAX_WINDOW_SECS} seconds"),
        ));
    }
    Ok(())
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp dir is UTF-8")
    }

    #[test]
    fn test_trigger_config_defaults() {
        let config = TriggerConfig::default();
        assert!(config.command.is_empty());
        assert_eq!(config.debounce(), Duration::from_secs(3));
        assert_eq!(config.settle(), Duration::from_secs(2));
    }

    #[test]
    fn test_fractional_seconds() {
        let config = TriggerConfig {
            debounce_secs: 0.25,
            settle_secs: 0.0,
            ..TriggerConfig::default()
        };
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.settle(), Duration::ZERO);
    }

    #[test]
    fn test_validate_canonicalizes_root() {
        let dir = TempDir::new().expect("temp dir");
        let nested = utf8_dir(&dir).join("a");
        std::fs::create_dir(&nested).expect("mkdir");

        let config = Config::new(nested.join("..").join("a"), "true")
            .validate()
            .expect("valid config");

        assert!(config.watch.root.is_absolute());
        assert!(!config.watch.root.as_str().contains(".."));
        assert_eq!(config.watch.root.file_name(), Some("a"));
    }

    #[test]
    fn test_validate_missing_root() {
        let result = Config::new("/nonexistent/syncwatch/root", "true").validate();
        assert!(matches!(result, Err(ConfigError::MissingDirectory(_))));
    }

    #[test]
    fn test_validate_root_is_file() {
        let dir = TempDir::new().expect("temp dir");
        let file = utf8_dir(&dir).join("file.txt");
        std::fs::write(&file, "x").expect("write");

        let result = Config::new(file, "true").validate();
        assert!(matches!(result, Err(ConfigError::NotADirectory(_))));
    }

    #[test]
    fn test_validate_empty_root() {
        let result = Config::new("", "true").validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidOption { ref option, .. }) if option == "WATCH_DIR"
        ));
    }

    #[test]
    fn test_validate_blank_command() {
        let dir = TempDir::new().expect("temp dir");
        let result = Config::new(utf8_dir(&dir), "   ").validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidOption { ref option, .. }) if option == "ONCHANGE_CMD"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_durations() {
        let dir = TempDir::new().expect("temp dir");

        let mut negative = Config::new(utf8_dir(&dir), "true");
        negative.trigger.debounce_secs = -1.0;
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::InvalidOption { ref option, .. }) if option == "DEBOUNCE_TIME"
        ));

        let mut infinite = Config::new(utf8_dir(&dir), "true");
        infinite.trigger.settle_secs = f64::INFINITY;
        assert!(matches!(
            infinite.validate(),
            Err(ConfigError::InvalidOption { ref option, .. }) if option == "ONCHANGE_CMD_TIME"
        ));
    }

    #[test]
    fn test_validate_rejects_huge_durations() {
        let dir = TempDir::new().expect("temp dir");

        for secs in [MAX_WINDOW_SECS + 1.0, 1e19, 2e19, f64::MAX] {
            let mut config = Config::new(utf8_dir(&dir), "true");
            config.trigger.debounce_secs = secs;
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::InvalidOption { ref option, .. }) if option == "DEBOUNCE_TIME"
                ),
                "{secs} accepted"
            );
        }

        let mut config = Config::new(utf8_dir(&dir), "true");
        config.trigger.settle_secs = 1e19;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidOption { ref option, .. }) if option == "ONCHANGE_CMD_TIME"
        ));
    }

    #[test]
    fn test_validate_accepts_one_day() {
        let dir = TempDir::new().expect("temp dir");
        let mut config = Config::new(utf8_dir(&dir), "true");
        config.trigger.debounce_secs = MAX_WINDOW_SECS;

        let config = config.validate().expect("one day is allowed");
        assert_eq!(config.trigger.debounce(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_validate_drops_empty_patterns() {
        let dir = TempDir::new().expect("temp dir");
        let mut config = Config::new(utf8_dir(&dir), "true");
        config.watch.include = Some(String::new());
        config.watch.exclude = Some(r"\.swp$".to_owned());

        let config = config.validate().expect("valid config");
        assert!(config.watch.include.is_none());
        assert_eq!(config.watch.exclude.as_deref(), Some(r"\.swp$"));
    }

    #[test]
    fn test_config_deserialize_with_missing_fields() {
        let json = r#"{"trigger": {"command": "sync"}}"#;
        let config: Config = serde_json::from_str(json).expect("parse");
        assert_eq!(config.trigger.command, "sync");
        // Other fields should have defaults
        assert!((config.trigger.debounce_secs - DEFAULT_DEBOUNCE_SECS).abs() < f64::EPSILON);
        assert!(config.watch.include.is_none());
    }
}
