//! Signal routing into the coordinator.
//!
//! Every producer (the watch callback thread, the debounce and settle
//! timers, the CLI's OS signal task) posts a [`Signal`] through a
//! [`SignalSender`]. The [`SignalRouter`] is the single receiving end, owned
//! by the [`Coordinator`](crate::Coordinator), so all state transitions are
//! serialized on one task.
//!
//! The channel is unbounded: posting never blocks and never drops a message.

use tokio::sync::mpsc;

use sw_watcher::{ChangeEvent, EventSink};

/// A message for the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// The watch admitted a file change.
    ChangeDetected(ChangeEvent),

    /// The debounce timer elapsed.
    FireTimer {
        /// Generation the timer was armed with.
        generation: u64,
    },

    /// Stop watching until an explicit resume.
    PauseWatch,

    /// Restart the watch.
    ///
    /// The settle timer posts `Some(generation)`; external requests post
    /// `None`.
    ResumeWatch {
        /// Settle timer generation, if posted by the settle timer.
        generation: Option<u64>,
    },
}

impl Signal {
    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ChangeDetected(_) => "change-detected",
            Self::FireTimer { .. } => "fire-timer",
            Self::PauseWatch => "pause-watch",
            Self::ResumeWatch { .. } => "resume-watch",
        }
    }
}

/// Cloneable posting handle for the router.
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<Signal>,
}

impl SignalSender {
    /// Posts a signal.
    ///
    /// Returns `false` if the router has been dropped.
    pub fn send(&self, signal: Signal) -> bool {
        self.tx.send(signal).is_ok()
    }

    /// Requests an external pause.
    pub fn pause(&self) -> bool {
        self.send(Signal::PauseWatch)
    }

    /// Requests an external resume.
    pub fn resume(&self) -> bool {
        self.send(Signal::ResumeWatch { generation: None })
    }
}

impl EventSink for SignalSender {
    fn deliver(&self, event: ChangeEvent) -> bool {
        self.send(Signal::ChangeDetected(event))
    }
}

/// Receiving end of the signal channel.
#[derive(Debug)]
pub struct SignalRouter {
    tx: mpsc::UnboundedSender<Signal>,
    rx: mpsc::UnboundedReceiver<Signal>,
}

impl Default for SignalRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Returns a new posting handle.
    #[must_use]
    pub fn sender(&self) -> SignalSender {
        SignalSender {
            tx: self.tx.clone(),
        }
    }

    /// Waits for the next signal, in posting order.
    ///
    /// The router holds a sender of its own, so the channel never closes
    /// while it is alive.
    pub async fn recv(&mut self) -> Signal {
        match self.rx.recv().await {
            Some(signal) => signal,
            None => std::future::pending().await,
        }
    }

    /// Number of queued signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use sw_watcher::ChangeKind;

    #[tokio::test]
    async fn test_signals_arrive_in_order() {
        let mut router = SignalRouter::new();
        let sender = router.sender();

        assert!(sender.send(Signal::FireTimer { generation: 1 }));
        assert!(sender.pause());
        assert!(sender.resume());

        assert_eq!(router.len(), 3);
        assert_eq!(router.recv().await, Signal::FireTimer { generation: 1 });
        assert_eq!(router.recv().await, Signal::PauseWatch);
        assert_eq!(router.recv().await, Signal::ResumeWatch { generation: None });
        assert!(router.is_empty());
    }

    #[tokio::test]
    async fn test_sender_is_an_event_sink() {
        let mut router = SignalRouter::new();
        let sender = router.sender();
        let event = ChangeEvent::new(Utf8PathBuf::from("/etc/pihole/custom.list"), ChangeKind::Modified);

        assert!(sender.deliver(event.clone()));
        assert_eq!(router.len(), 1);
        assert_eq!(router.recv().await, Signal::ChangeDetected(event));
        assert!(router.is_empty());
    }

    #[test]
    fn test_send_after_router_dropped() {
        let router = SignalRouter::new();
        let sender = router.sender();
        drop(router);

        assert!(!sender.pause());
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(Signal::PauseWatch.name(), "pause-watch");
        assert_eq!(Signal::FireTimer { generation: 7 }.name(), "fire-timer");
    }
}
