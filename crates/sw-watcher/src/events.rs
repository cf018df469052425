//! Event types for change notifications.
//!
//! A [`ChangeEvent`] is produced for every admitted file mutation under the
//! watched root and consumed immediately by the engine. Nothing here is
//! persisted.
//!
//! # Event Flow
//!
//! ```text
//! notify::Event
//!        │  ChangeKind::from_notify (drop removals, metadata, reads)
//!        ▼
//!   FileFilter (include / exclude)
//!        │
//!        ▼
//!   ChangeDetector (mtime + size unchanged? drop)
//!        │
//!        ▼
//!   ChangeEvent ──► EventSink
//! ```

use std::fmt;
use std::time::Instant;

use camino::Utf8PathBuf;
use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind};

/// The kind of mutation that produced a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// File contents changed, or a writer closed the file.
    Modified,
    /// A new file appeared.
    Created,
    /// A file was renamed into, out of, or within the tree.
    Moved,
}

impl ChangeKind {
    /// Maps a raw notify event kind to a change kind.
    ///
    /// Returns `None` for kinds that never trigger a sync: removals,
    /// metadata-only modifications (mtime/chmod noise), reads, directory
    /// creation and anything notify cannot classify.
    ///
    /// # Examples
    ///
    /// ```
    /// use notify::EventKind;
    /// use notify::event::{CreateKind, MetadataKind, ModifyKind, RemoveKind};
    /// use sw_watcher::ChangeKind;
    ///
    /// assert_eq!(
    ///     ChangeKind::from_notify(&EventKind::Create(CreateKind::File)),
    ///     Some(ChangeKind::Created)
    /// );
    /// assert_eq!(
    ///     ChangeKind::from_notify(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any))),
    ///     None
    /// );
    /// assert_eq!(ChangeKind::from_notify(&EventKind::Remove(RemoveKind::File)), None);
    /// ```
    #[must_use]
    pub fn from_notify(kind: &notify::EventKind) -> Option<Self> {
        use notify::EventKind;

        match kind {
            EventKind::Create(CreateKind::Folder) => None,
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Moved),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(Self::Modified),
            EventKind::Access(_) | EventKind::Remove(_) | EventKind::Any | EventKind::Other => None,
        }
    }

    /// Returns a short lowercase label for logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Modified => "modified",
            Self::Created => "created",
            Self::Moved => "moved",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single admitted file mutation.
///
/// # Examples
///
/// ```
/// use sw_watcher::{ChangeEvent, ChangeKind};
/// use camino::Utf8PathBuf;
///
/// let event = ChangeEvent::new(Utf8PathBuf::from("/etc/pihole/custom.list"), ChangeKind::Modified);
/// assert_eq!(event.file_name(), Some("custom.list"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path of the file that changed.
    pub path: Utf8PathBuf,

    /// What happened to it.
    pub kind: ChangeKind,

    /// When the event was admitted.
    ///
    /// Uses [`Instant`] for monotonic timing, suitable for measuring
    /// elapsed time but not for wall-clock display.
    pub timestamp: Instant,
}

impl ChangeEvent {
    /// Creates a new event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, kind: ChangeKind) -> Self {
        Self {
            path,
            kind,
            timestamp: Instant::now(),
        }
    }

    /// Returns the file name without the directory path.
    #[inline]
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}
