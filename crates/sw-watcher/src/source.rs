//! Watch sources.
//!
//! A [`WatchSource`] is the narrow interface to the filesystem-event
//! primitive: attach a recursive watch to a root and push raw notifications
//! into a [`SessionSink`], detach on request. [`NotifySource`] is the
//! production implementation backed by `notify`'s recommended watcher
//! (inotify, FSEvents, kqueue or ReadDirectoryChangesW).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 notify callback thread                   │
//! │  ┌───────────────────┐    ┌─────────────┐                │
//! │  │ RecommendedWatcher │ -> │ SessionSink │ -- deliver --► │──► EventSink
//! │  │ (recursive)        │    │ (admission) │                │   (engine router)
//! │  └───────────────────┘    └─────────────┘                │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use camino::Utf8Path;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::WatchError;
use crate::events::ChangeKind;
use crate::sink::SessionSink;

/// A startable, stoppable producer of raw change notifications.
///
/// Sources are owned by a [`WatchController`](crate::WatchController) and
/// are only ever driven through it.
pub trait WatchSource: Send + 'static {
    /// Attaches a recursive watch to `root`, feeding `sink`.
    ///
    /// Called only while the source is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the watch cannot be established; the controller
    /// treats this as fatal.
    fn start(&mut self, root: &Utf8Path, sink: SessionSink) -> Result<(), WatchError>;

    /// Detaches the watch. Must be a no-op when already stopped.
    fn stop(&mut self);
}

/// Watch source backed by the `notify` crate.
#[derive(Default)]
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
}

impl std::fmt::Debug for NotifySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySource")
            .field("running", &self.watcher.is_some())
            .finish()
    }
}

impl NotifySource {
    /// Creates a stopped source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WatchSource for NotifySource {
    fn start(&mut self, root: &Utf8Path, sink: SessionSink) -> Result<(), WatchError> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let Some(kind) = ChangeKind::from_notify(&event.kind) else {
                        tracing::trace!(kind = ?event.kind, "Ignoring notify event kind");
                        return;
                    };
                    for path in offered_paths(&event) {
                        sink.offer(path, kind);
                    }
                }
                // Vanished entries, queue overflows: log and keep watching.
                Err(error) => tracing::warn!(error = %error, "Transient watch error"),
            }
        })?;

        watcher.watch(root.as_std_path(), RecursiveMode::Recursive)?;
        self.watcher = Some(watcher);
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the watcher detaches every watch and ends its event loop.
        self.watcher = None;
    }
}

/// Paths of a notification worth offering. A rename carrying both ends
/// reports only its destination.
fn offered_paths(event: &notify::Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .last()
            .map(std::slice::from_ref)
            .unwrap_or_default(),
        _ => &event.paths,
    }
}
