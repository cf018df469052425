//! Error types for the sw-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while configuring or running a watch session.

use camino::Utf8PathBuf;

/// Errors that can occur during file watching operations.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal when starting a
///   session; the same errors reported by a running source are only logged
/// - **Path not found** ([`WatchError::PathNotFound`]): Fatal - the root must exist
/// - **Not a directory** ([`WatchError::NotADirectory`]): Fatal
/// - **Invalid pattern** ([`WatchError::InvalidPattern`]): Fatal - configuration error
///
/// Non-UTF-8 paths in a running session are not errors: the session sink
/// logs and skips them.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The watch root does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The watch root is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    /// An include or exclude pattern failed to compile.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The regex compiler's complaint.
        source: regex::Error,
    },
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::InvalidPattern`] error.
    #[inline]
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_error_path_not_found() {
        let err = WatchError::path_not_found("srv/missing");
        assert!(matches!(err, WatchError::PathNotFound(ref p) if p == "srv/missing"));
        assert_eq!(err.to_string(), "path does not exist: srv/missing");
    }

    #[test]
    fn test_watch_error_not_a_directory() {
        let err = WatchError::NotADirectory(Utf8PathBuf::from("/etc/hosts"));
        assert_eq!(err.to_string(), "not a directory: /etc/hosts");
    }

    #[test]
    fn test_watch_error_invalid_pattern() {
        let source = regex::Regex::new("(").expect_err("unbalanced group");
        let err = WatchError::invalid_pattern("(", source);
        assert!(err.to_string().starts_with("invalid pattern '('"));
    }
}
