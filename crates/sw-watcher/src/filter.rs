//! Path filtering for watch events.
//!
//! Filtering happens at the source, on the notify thread, so rejected paths
//! never reach the engine's channel.
//!
//! # Design
//!
//! The [`FileFilter`] trait is a plain predicate over the full path string.
//! [`PatternFilter`] is the implementation driven by `WATCH_INCLUDE` and
//! `WATCH_EXCLUDE`: both are regular expressions searched (not anchored)
//! anywhere in the absolute path, and exclusion always wins.
//!
//! # Examples
//!
//! ```
//! use sw_watcher::{FileFilter, PatternFilter};
//! use camino::Utf8Path;
//!
//! let filter = PatternFilter::new(Some(r"\.(conf|list)$"), Some(r"/\.git/"))?;
//!
//! assert!(filter.should_process(Utf8Path::new("/etc/pihole/custom.list")));
//! assert!(!filter.should_process(Utf8Path::new("/etc/pihole/gravity.db")));
//! assert!(!filter.should_process(Utf8Path::new("/etc/pihole/.git/x.conf")));
//! # Ok::<(), sw_watcher::WatchError>(())
//! ```

use camino::Utf8Path;
use regex::Regex;

use crate::error::WatchError;

/// A filter for determining which file events to process.
///
/// # Thread Safety
///
/// Filters must be [`Send`] and [`Sync`] because they are evaluated on the
/// notify callback thread while the controller keeps a shared handle for the
/// next session.
///
/// # Examples
///
/// ```
/// use sw_watcher::FileFilter;
/// use camino::Utf8Path;
///
/// struct NoSwapFiles;
///
/// impl FileFilter for NoSwapFiles {
///     fn should_process(&self, path: &Utf8Path) -> bool {
///         path.extension() != Some("swp")
///     }
/// }
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if the file at the given path should be processed.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// Include/exclude filter over regular expressions.
///
/// | include | exclude | result |
/// |---|---|---|
/// | absent or matches | absent or no match | admitted |
/// | absent or matches | matches | rejected |
/// | no match | any | rejected |
#[derive(Debug, Clone, Default)]
pub struct PatternFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl PatternFilter {
    /// Compiles a filter from optional include and exclude patterns.
    ///
    /// Empty strings are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] if either pattern fails to
    /// compile.
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self, WatchError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Builds the filter described by a [`sw_core::WatchConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidPattern`] if either pattern fails to
    /// compile.
    pub fn from_config(config: &sw_core::WatchConfig) -> Result<Self, WatchError> {
        Self::new(config.include.as_deref(), config.exclude.as_deref())
    }

    /// Returns the include pattern source, if any.
    #[must_use]
    pub fn include(&self) -> Option<&str> {
        self.include.as_ref().map(Regex::as_str)
    }

    /// Returns the exclude pattern source, if any.
    #[must_use]
    pub fn exclude(&self) -> Option<&str> {
        self.exclude.as_ref().map(Regex::as_str)
    }
}

fn compile(pattern: Option<&str>) -> Result<Option<Regex>, WatchError> {
    match pattern {
        Some(p) if !p.is_empty() => Regex::new(p)
            .map(Some)
            .map_err(|source| WatchError::invalid_pattern(p, source)),
        _ => Ok(None),
    }
}

impl FileFilter for PatternFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        let path = path.as_str();

        if self.exclude.as_ref().is_some_and(|re| re.is_match(path)) {
            return false;
        }

        self.include.as_ref().is_none_or(|re| re.is_match(path))
    }
}

// Implement FileFilter for Arc-wrapped filters (the controller shares one across sessions)
impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_patterns_admits_everything() {
        let filter = PatternFilter::default();
        assert!(filter.should_process(Utf8Path::new("/srv/anything.txt")));
        assert!(filter.should_process(Utf8Path::new("")));
    }

    #[test]
    fn test_empty_patterns_are_absent() {
        let filter = PatternFilter::new(Some(""), Some("")).expect("valid");
        assert!(filter.include().is_none());
        assert!(filter.exclude().is_none());
        assert!(filter.should_process(Utf8Path::new("/srv/a.conf")));
    }

    #[test]
    fn test_include_only() {
        let filter = PatternFilter::new(Some(r"\.conf$"), None).expect("valid");
        assert!(filter.should_process(Utf8Path::new("/etc/dnsmasq.d/01-pihole.conf")));
        assert!(!filter.should_process(Utf8Path::new("/etc/dnsmasq.d/01-pihole.conf.bak")));
    }

    #[test]
    fn test_exclude_only() {
        let filter = PatternFilter::new(None, Some(r"\.db(-journal)?$")).expect("valid");
        assert!(filter.should_process(Utf8Path::new("/etc/pihole/custom.list")));
        assert!(!filter.should_process(Utf8Path::new("/etc/pihole/gravity.db")));
        assert!(!filter.should_process(Utf8Path::new("/etc/pihole/gravity.db-journal")));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let filter = PatternFilter::new(Some(r"pihole"), Some(r"pihole-FTL\.log")).expect("valid");
        assert!(filter.should_process(Utf8Path::new("/etc/pihole/setupVars.conf")));
        assert!(!filter.should_process(Utf8Path::new("/var/log/pihole/pihole-FTL.log")));
    }

    #[test]
    fn test_search_is_unanchored() {
        let filter = PatternFilter::new(Some("custom"), None).expect("valid");
        assert!(filter.should_process(Utf8Path::new("/etc/pihole/custom.list")));
        assert!(filter.should_process(Utf8Path::new("/tmp/custom/x")));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PatternFilter::new(Some("(unclosed"), None).expect_err("must fail");
        assert!(matches!(err, WatchError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_from_config() {
        let config = sw_core::WatchConfig {
            include: Some(r"\.toml$".to_owned()),
            exclude: None,
            ..sw_core::WatchConfig::default()
        };
        let filter = PatternFilter::from_config(&config).expect("valid");
        assert_eq!(filter.include(), Some(r"\.toml$"));
        assert!(filter.should_process(Utf8Path::new("/a/b.toml")));
    }

    #[test]
    fn test_arc_filter() {
        let filter: std::sync::Arc<dyn FileFilter> =
            std::sync::Arc::new(PatternFilter::new(Some("keep"), None).expect("valid"));
        assert!(filter.should_process(Utf8Path::new("/keep/me")));
        assert!(!filter.should_process(Utf8Path::new("/drop/me")));
    }
}
