//! Single-slot cancel-and-restart timer.
//!
//! # Debouncing Logic
//!
//! - `arm()` aborts any pending fire, bumps the generation and schedules a
//!   new fire `interval` ahead
//! - on expiry the timer posts exactly one signal carrying the generation
//!   it was armed with
//! - the coordinator calls `accept()` with that generation; a fire armed
//!   before the latest `arm()` or `cancel()` is rejected as stale
//!
//! A steady trickle of re-arms faster than `interval` defers the fire
//! indefinitely (last write wins).
//!
//! The same type drives the settle window: [`DebounceTimer::settle`] posts
//! [`Signal::ResumeWatch`] instead of [`Signal::FireTimer`].

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::router::{Signal, SignalSender};

/// Deadline offset used when `now + interval` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Timer bookkeeping, owned exclusively by its [`DebounceTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebounceState {
    /// A fire is pending.
    pub armed: bool,
    /// When the pending fire is due.
    pub deadline: Option<Instant>,
    /// Bumped on every arm and cancel.
    pub generation: u64,
}

/// Cancel-and-restart timer posting into the signal router.
pub struct DebounceTimer {
    name: &'static str,
    sender: SignalSender,
    make_signal: fn(u64) -> Signal,
    state: DebounceState,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for DebounceTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceTimer")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl DebounceTimer {
    /// Timer that posts [`Signal::FireTimer`].
    #[must_use]
    pub fn debounce(sender: SignalSender) -> Self {
        Self::new("debounce", sender, |generation| Signal::FireTimer { generation })
    }

    /// Timer that posts [`Signal::ResumeWatch`] with its generation.
    #[must_use]
    pub fn settle(sender: SignalSender) -> Self {
        Self::new("settle", sender, |generation| Signal::ResumeWatch {
            generation: Some(generation),
        })
    }

    fn new(name: &'static str, sender: SignalSender, make_signal: fn(u64) -> Signal) -> Self {
        Self {
            name,
            sender,
            make_signal,
            state: DebounceState::default(),
            task: None,
        }
    }

    /// (Re)schedules a single fire `interval` from now, cancelling any
    /// pending one. Returns the new generation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(&mut self, interval: Duration) -> u64 {
        self.abort_pending();

        self.state.generation += 1;
        self.state.armed = true;
        let now = Instant::now();
        let deadline = now
            .checked_add(interval)
            .unwrap_or_else(|| now + FAR_FUTURE);
        self.state.deadline = Some(deadline);

        let generation = self.state.generation;
        let signal = (self.make_signal)(generation);
        let sender = self.sender.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            sender.send(signal);
        }));

        tracing::trace!(timer = self.name, generation, ?interval, "Timer armed");
        generation
    }

    /// Clears a pending fire without firing.
    ///
    /// The generation is bumped so a fire already queued in the router is
    /// rejected by [`accept`](Self::accept).
    pub fn cancel(&mut self) {
        self.abort_pending();
        self.state.generation += 1;
        if self.state.armed {
            tracing::trace!(timer = self.name, "Timer cancelled");
        }
        self.state.armed = false;
        self.state.deadline = None;
    }

    /// Accepts a fire for `generation`, disarming the timer.
    ///
    /// Returns `false` for a stale or duplicate fire.
    pub fn accept(&mut self, generation: u64) -> bool {
        if !self.state.armed || generation != self.state.generation {
            return false;
        }
        self.state.armed = false;
        self.state.deadline = None;
        self.task = None;
        true
    }

    /// Returns `true` while a fire is pending.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.state.armed
    }

    /// Current generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.state.generation
    }

    /// Snapshot of the timer state.
    #[must_use]
    pub const fn state(&self) -> DebounceState {
        self.state
    }

    fn abort_pending(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.abort_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::SignalRouter;

    const INTERVAL: Duration = Duration::from_secs(3);

    fn assert_near(actual: Duration, expected: Duration) {
        let delta = actual.abs_diff(expected);
        assert!(delta <= Duration::from_millis(5), "{actual:?} != {expected:?}");
    }

    async fn next_fire(router: &mut SignalRouter, within: Duration) -> Option<Signal> {
        tokio::time::timeout(within, router.recv()).await.ok()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_interval() {
        let mut router = SignalRouter::new();
        let mut timer = DebounceTimer::debounce(router.sender());
        let start = Instant::now();

        let generation = timer.arm(INTERVAL);
        assert!(timer.is_armed());

        let fired = next_fire(&mut router, Duration::from_secs(10)).await;
        assert_eq!(fired, Some(Signal::FireTimer { generation }));
        assert_near(start.elapsed(), INTERVAL);

        assert!(timer.accept(generation));
        assert!(!timer.is_armed());
        assert!(!timer.accept(generation), "a second accept is a duplicate");
        assert_eq!(next_fire(&mut router, Duration::from_secs(10)).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_fire() {
        let mut router = SignalRouter::new();
        let mut timer = DebounceTimer::debounce(router.sender());
        let start = Instant::now();

        let first = timer.arm(INTERVAL);
        tokio::time::sleep(Duration::from_secs(1)).await;
        let second = timer.arm(INTERVAL);
        assert_ne!(first, second);

        let fired = next_fire(&mut router, Duration::from_secs(10)).await;
        assert_eq!(fired, Some(Signal::FireTimer { generation: second }));
        assert_near(start.elapsed(), Duration::from_secs(4));
        assert!(router.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trickle_defers_fire() {
        let mut router = SignalRouter::new();
        let mut timer = DebounceTimer::debounce(router.sender());
        let start = Instant::now();

        for _ in 0..10 {
            timer.arm(INTERVAL);
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(router.is_empty());
        }

        let fired = next_fire(&mut router, Duration::from_secs(10)).await;
        assert!(matches!(fired, Some(Signal::FireTimer { .. })));
        // Last arm at t=9s.
        assert_near(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let mut router = SignalRouter::new();
        let mut timer = DebounceTimer::debounce(router.sender());

        let generation = timer.arm(INTERVAL);
        timer.cancel();
        assert!(!timer.is_armed());
        assert_eq!(timer.state().deadline, None);

        assert_eq!(next_fire(&mut router, Duration::from_secs(10)).await, None);
        assert!(!timer.accept(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_fire_is_stale_after_cancel() {
        let mut router = SignalRouter::new();
        let mut timer = DebounceTimer::debounce(router.sender());

        let generation = timer.arm(INTERVAL);
        tokio::time::sleep(INTERVAL * 2).await;
        // Already posted, not yet consumed.
        assert_eq!(router.len(), 1);

        timer.cancel();
        assert_eq!(router.recv().await, Signal::FireTimer { generation });
        assert!(!timer.accept(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_pending_fire() {
        let mut router = SignalRouter::new();
        let mut timer = DebounceTimer::debounce(router.sender());
        timer.arm(INTERVAL);
        drop(timer);

        assert_eq!(next_fire(&mut router, Duration::from_secs(10)).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_timer_posts_resume() {
        let mut router = SignalRouter::new();
        let mut timer = DebounceTimer::settle(router.sender());

        let generation = timer.arm(Duration::from_secs(2));
        let fired = next_fire(&mut router, Duration::from_secs(10)).await;
        assert_eq!(
            fired,
            Some(Signal::ResumeWatch {
                generation: Some(generation)
            })
        );
        assert!(timer.accept(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_tracks_latest_arm() {
        let router = SignalRouter::new();
        let mut timer = DebounceTimer::debounce(router.sender());
        let start = Instant::now();

        timer.arm(INTERVAL);
        assert_eq!(timer.state().deadline, Some(start + INTERVAL));
        assert_eq!(timer.generation(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_interval_does_not_panic() {
        let mut router = SignalRouter::new();
        let mut timer = DebounceTimer::debounce(router.sender());

        timer.arm(Duration::MAX);
        assert!(timer.is_armed());
        assert!(timer.state().deadline.is_some());
        assert_eq!(next_fire(&mut router, Duration::from_secs(60)).await, None);
    }
}
