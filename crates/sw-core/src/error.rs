//! Error types for the sw-core crate.
//!
//! This module provides the [`ConfigError`] type for configuration problems
//! detected while validating the knobs handed to the daemon. Every variant is
//! fatal: the process reports it once and exits non-zero.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration validation.
///
/// # Examples
///
/// ```
/// use sw_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/srv/config"));
/// assert!(error.to_string().contains("/srv/config"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The watch root does not exist.
    #[error("missing required directory: {0}")]
    MissingDirectory(Utf8PathBuf),

    /// The watch root exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while resolving the watch root.
    #[error("failed to resolve configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_display() {
        let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/missing/dir"));
        assert!(error.to_string().contains("/missing/dir"));
    }

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("DEBOUNCE_TIME", "must not be negative");
        let msg = error.to_string();
        assert!(msg.contains("DEBOUNCE_TIME"));
        assert!(msg.contains("must not be negative"));
    }
}
