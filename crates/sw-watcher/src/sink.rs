//! Event delivery from watch sources.
//!
//! A [`WatchSource`](crate::WatchSource) never talks to the consumer
//! directly. It hands raw notifications to a [`SessionSink`], which applies
//! the admission pipeline (session gate, UTF-8 check, directory check, path
//! filter, real-change check) and forwards survivors to an [`EventSink`].

use std::path::Path;
use std::sync::Arc;

use camino::Utf8Path;
use parking_lot::{Mutex, RwLock};

use crate::detector::ChangeDetector;
use crate::events::{ChangeEvent, ChangeKind};
use crate::filter::FileFilter;

/// Downstream consumer of admitted change events.
///
/// Implementations must not block: `deliver` runs on the watcher's callback
/// thread.
pub trait EventSink: Send + Sync + 'static {
    /// Delivers one event.
    ///
    /// Returns `false` once the receiving side has gone away.
    fn deliver(&self, event: ChangeEvent) -> bool;
}

impl EventSink for std::sync::mpsc::Sender<ChangeEvent> {
    fn deliver(&self, event: ChangeEvent) -> bool {
        self.send(event).is_ok()
    }
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn deliver(&self, event: ChangeEvent) -> bool {
        (**self).deliver(event)
    }
}

/// Admission pipeline bound to one watch session.
///
/// Created by the [`WatchController`](crate::WatchController) on every
/// start and handed to the source. Once the session is stopped the gate is
/// closed and every further [`offer`](Self::offer) is discarded, including
/// offers racing with the stop itself.
pub struct SessionSink {
    pub(crate) gate: Arc<RwLock<bool>>,
    pub(crate) filter: Arc<dyn FileFilter>,
    pub(crate) detector: Arc<Mutex<ChangeDetector>>,
    pub(crate) downstream: Arc<dyn EventSink>,
}

impl std::fmt::Debug for SessionSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSink")
            .field("open", &*self.gate.read())
            .finish_non_exhaustive()
    }
}

impl SessionSink {
    /// Offers a raw notification for admission.
    ///
    /// Returns `true` if a [`ChangeEvent`] was delivered downstream.
    pub fn offer(&self, path: &Path, kind: ChangeKind) -> bool {
        // Held across delivery so a concurrent stop waits for us.
        let open = self.gate.read();
        if !*open {
            tracing::trace!(path = %path.display(), "Session closed, dropping notification");
            return false;
        }

        let Some(utf8_path) = Utf8Path::from_path(path) else {
            tracing::warn!(path = %path.display(), "Skipping non-UTF-8 path in file event");
            return false;
        };

        if utf8_path.is_dir() {
            return false;
        }

        if !self.filter.should_process(utf8_path) {
            tracing::trace!(path = %utf8_path, "Filtered out file event");
            return false;
        }

        if !self.detector.lock().observe(utf8_path) {
            tracing::debug!(path = %utf8_path, "Skipping file event, metadata unchanged");
            return false;
        }

        tracing::debug!(path = %utf8_path, kind = %kind, "File changed");

        let delivered = self
            .downstream
            .deliver(ChangeEvent::new(utf8_path.to_path_buf(), kind));
        if !delivered {
            tracing::debug!("Event sink closed, dropping notification");
        }
        delivered
    }
}
