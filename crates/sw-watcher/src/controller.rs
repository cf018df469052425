//! Watch session lifecycle.
//!
//! The [`WatchController`] is the only owner of the watch session. It starts
//! and stops its [`WatchSource`] on request and guarantees:
//!
//! - at most one session is active at a time;
//! - `stop()` is idempotent and never fails;
//! - once `stop()` returns, no [`ChangeEvent`](crate::ChangeEvent) from the
//!   old session reaches the sink, even if files keep changing;
//! - a failure to start is returned to the caller untouched (fatal, no
//!   retry).

use std::sync::Arc;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::{Mutex, RwLock};

use crate::detector::ChangeDetector;
use crate::error::WatchError;
use crate::filter::FileFilter;
use crate::sink::{EventSink, SessionSink};
use crate::source::WatchSource;

/// An active watch session.
#[derive(Debug)]
struct WatchSession {
    /// Cleared on stop; shared with the session's [`SessionSink`].
    gate: Arc<RwLock<bool>>,
    started_at: Instant,
}

/// Owns a [`WatchSource`] and its single session.
pub struct WatchController<S: WatchSource> {
    source: S,
    root: Utf8PathBuf,
    filter: Arc<dyn FileFilter>,
    /// Survives across sessions so a resume does not re-report untouched files.
    detector: Arc<Mutex<ChangeDetector>>,
    sink: Arc<dyn EventSink>,
    session: Option<WatchSession>,
    sessions_started: u64,
}

impl<S: WatchSource> std::fmt::Debug for WatchController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchController")
            .field("root", &self.root)
            .field("is_running", &self.is_running())
            .field("sessions_started", &self.sessions_started)
            .finish_non_exhaustive()
    }
}

impl<S: WatchSource> WatchController<S> {
    /// Creates a stopped controller.
    ///
    /// # Arguments
    ///
    /// * `source` - The watch primitive to drive
    /// * `root` - Directory watched recursively
    /// * `filter` - Include/exclude filter applied to every notification
    /// * `sink` - Receiver of admitted events
    pub fn new<F, K>(source: S, root: impl Into<Utf8PathBuf>, filter: F, sink: K) -> Self
    where
        F: FileFilter,
        K: EventSink,
    {
        Self {
            source,
            root: root.into(),
            filter: Arc::new(filter),
            detector: Arc::new(Mutex::new(ChangeDetector::new())),
            sink: Arc::new(sink),
            session: None,
            sessions_started: 0,
        }
    }

    /// Starts a session. A no-op if one is already running.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] or [`WatchError::NotADirectory`]
    /// for an unusable root, or the source's own error if the watch cannot
    /// be attached (for example permission denied).
    pub fn start(&mut self) -> Result<(), WatchError> {
        if self.session.is_some() {
            tracing::debug!(path = %self.root, "Watch already running");
            return Ok(());
        }

        if !self.root.exists() {
            return Err(WatchError::path_not_found(&self.root));
        }
        if !self.root.is_dir() {
            return Err(WatchError::NotADirectory(self.root.clone()));
        }

        let gate = Arc::new(RwLock::new(true));
        let sink = SessionSink {
            gate: Arc::clone(&gate),
            filter: Arc::clone(&self.filter),
            detector: Arc::clone(&self.detector),
            downstream: Arc::clone(&self.sink),
        };

        self.source.start(&self.root, sink)?;

        self.session = Some(WatchSession {
            gate,
            started_at: Instant::now(),
        });
        self.sessions_started += 1;

        tracing::info!(path = %self.root, "File watcher started");
        Ok(())
    }

    /// Stops the running session. A no-op if already stopped.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            tracing::debug!(path = %self.root, "Watch already stopped");
            return;
        };

        // Waits for any in-flight delivery, then rejects the rest.
        *session.gate.write() = false;
        self.source.stop();

        tracing::info!(
            path = %self.root,
            uptime_ms = session.started_at.elapsed().as_millis(),
            "File watcher stopped"
        );
    }

    /// Handles a pause request: stops the session.
    pub fn pause(&mut self) {
        tracing::debug!("Pause requested");
        self.stop();
    }

    /// Handles a resume request: starts a new session.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub fn resume(&mut self) -> Result<(), WatchError> {
        tracing::debug!("Resume requested");
        self.start()
    }

    /// Returns `true` while a session is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the watched root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Number of sessions started over the controller's lifetime.
    #[must_use]
    pub fn sessions_started(&self) -> u64 {
        self.sessions_started
    }
}

impl<S: WatchSource> Drop for WatchController<S> {
    fn drop(&mut self) {
        self.stop();
    }
}
