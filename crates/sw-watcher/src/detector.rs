//! Real-change detection.
//!
//! Editors, `touch` and sync tools routinely produce notifications for files
//! whose contents did not change. [`ChangeDetector`] remembers the last
//! modification time and size seen for each path and drops notifications
//! that leave both untouched.

use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;

/// Modification time and size observed for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Snapshot {
    modified: Option<SystemTime>,
    len: u64,
}

/// Per-path stat snapshots used to tell real changes from noise.
///
/// # Examples
///
/// ```no_run
/// use sw_watcher::ChangeDetector;
/// use camino::Utf8Path;
///
/// let mut detector = ChangeDetector::new();
/// let path = Utf8Path::new("/etc/pihole/custom.list");
///
/// assert!(detector.observe(path)); // first sighting
/// assert!(!detector.observe(path)); // nothing changed on disk since
/// ```
#[derive(Debug, Default)]
pub struct ChangeDetector {
    snapshots: FxHashMap<Utf8PathBuf, Snapshot>,
}

impl ChangeDetector {
    /// Creates an empty detector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the current state of `path` and reports whether it differs
    /// from the previous observation.
    ///
    /// A path that can no longer be stat'ed (deleted, renamed away) forgets
    /// its snapshot and counts as a change.
    pub fn observe(&mut self, path: &Utf8Path) -> bool {
        let Ok(metadata) = path.metadata() else {
            self.snapshots.remove(path);
            return true;
        };

        let current = Snapshot {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        };

        if self.snapshots.get(path) == Some(&current) {
            return false;
        }

        self.snapshots.insert(path.to_path_buf(), current);
        true
    }

    /// Number of paths with a recorded snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Returns `true` if no snapshot is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
