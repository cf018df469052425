//! The pause/trigger/settle state machine.
//!
//! ```text
//!            ChangeDetected (arm debounce)
//!              ┌──────────┐
//!              ▼          │
//!         ┌──────────────────────┐  FireTimer   ┌────────────────┐
//!  ──────►│ Watching / Debouncing │ ───────────► │ Paused-Running │
//!         └──────────────────────┘ stop watch   └───────┬────────┘
//!                     ▲             run command          │ command done
//!                     │                                  ▼
//!                     │    ResumeWatch          ┌─────────────────┐
//!                     └──────────────────────── │ Paused-Settling │
//!                        restart watch          └─────────────────┘
//! ```
//!
//! All transitions happen on the task running [`Coordinator::run`], in the
//! order signals arrive at the router.

use std::fmt;
use std::time::Duration;

use sw_core::Config;
use sw_watcher::{ChangeEvent, PatternFilter, WatchController, WatchSource};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::debounce::DebounceTimer;
use crate::error::EngineError;
use crate::executor::TriggerExecutor;
use crate::router::{Signal, SignalRouter, SignalSender};

/// Where the coordinator is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatorState {
    /// Watch running, no change pending.
    #[default]
    Watching,
    /// Watch running, debounce timer pending.
    Debouncing,
    /// Watch stopped, change command in flight.
    PausedRunning,
    /// Watch stopped, waiting for the settle timer or an external resume.
    PausedSettling,
}

impl CoordinatorState {
    /// Returns `true` while the watch is stopped.
    #[must_use]
    pub const fn is_paused(self) -> bool {
        matches!(self, Self::PausedRunning | Self::PausedSettling)
    }

    /// Short label for logging.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Watching => "watching",
            Self::Debouncing => "debouncing",
            Self::PausedRunning => "paused-running",
            Self::PausedSettling => "paused-settling",
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Counters kept over the coordinator's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Change command invocations.
    pub triggers: u64,
    /// Invocations that exited non-zero, died from a signal or failed to spawn.
    pub failed_triggers: u64,
    /// Change events dropped because the watch was paused.
    pub suppressed_events: u64,
    /// Timer fires rejected as stale.
    pub stale_fires: u64,
}

/// Owns the watch, the timers and the executor, and drives them from the
/// signal router.
pub struct Coordinator<S: WatchSource, E: TriggerExecutor> {
    watch: WatchController<S>,
    executor: E,
    router: SignalRouter,
    debounce: DebounceTimer,
    settle: DebounceTimer,
    command: String,
    debounce_interval: Duration,
    settle_interval: Duration,
    state: CoordinatorState,
    stats: CoordinatorStats,
}

impl<S: WatchSource, E: TriggerExecutor> fmt::Debug for Coordinator<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state)
            .field("stats", &self.stats)
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

impl<S: WatchSource, E: TriggerExecutor> Coordinator<S, E> {
    /// Wires a coordinator for a validated configuration.
    ///
    /// The watch is not started until [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Watch`] if an include or exclude pattern does
    /// not compile.
    pub fn new(config: &Config, source: S, executor: E) -> Result<Self, EngineError> {
        let filter = PatternFilter::from_config(&config.watch)?;
        let router = SignalRouter::new();
        let watch = WatchController::new(source, config.watch.root.clone(), filter, router.sender());

        Ok(Self {
            watch,
            executor,
            debounce: DebounceTimer::debounce(router.sender()),
            settle: DebounceTimer::settle(router.sender()),
            router,
            command: config.trigger.command.clone(),
            debounce_interval: config.trigger.debounce(),
            settle_interval: config.trigger.settle(),
            state: CoordinatorState::default(),
            stats: CoordinatorStats::default(),
        })
    }

    /// Returns a handle for posting external signals (pause, resume).
    #[must_use]
    pub fn sender(&self) -> SignalSender {
        self.router.sender()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    /// Starts the watch and processes signals until `shutdown` fires.
    ///
    /// On shutdown an in-flight command is terminated (the executor observes
    /// the same token), timers are cancelled and the watch is stopped.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Watch`] if the watch cannot be started or
    /// resumed; the shutdown sequence has already run by then.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<CoordinatorStats, EngineError> {
        self.watch.start()?;
        info!(
            path = %self.watch.root(),
            debounce_ms = self.debounce_interval.as_millis(),
            settle_ms = self.settle_interval.as_millis(),
            "Watching for changes"
        );

        let result = loop {
            let signal = tokio::select! {
                biased;
                () = shutdown.cancelled() => break Ok(()),
                signal = self.router.recv() => signal,
            };

            if let Err(err) = self.handle(signal, &shutdown).await {
                error!(error = %err, "Coordinator failed");
                break Err(err);
            }

            if shutdown.is_cancelled() {
                break Ok(());
            }
        };

        self.shutdown();
        result.map(|()| self.stats)
    }

    async fn handle(&mut self, signal: Signal, shutdown: &CancellationToken) -> Result<(), EngineError> {
        trace!(signal = signal.name(), state = %self.state, "Signal received");

        match signal {
            Signal::ChangeDetected(event) => self.on_change(&event),
            Signal::FireTimer { generation } => self.on_fire(generation, shutdown).await,
            Signal::PauseWatch => self.on_pause_request(),
            Signal::ResumeWatch { generation } => self.on_resume(generation)?,
        }
        Ok(())
    }

    fn on_change(&mut self, event: &ChangeEvent) {
        if self.state.is_paused() {
            self.stats.suppressed_events += 1;
            debug!(path = %event.path, state = %self.state, "Change while paused, ignoring");
            return;
        }

        let generation = self.debounce.arm(self.debounce_interval);
        self.state = CoordinatorState::Debouncing;
        debug!(path = %event.path, kind = %event.kind, generation, "Change detected, debouncing");
    }

    async fn on_fire(&mut self, generation: u64, shutdown: &CancellationToken) {
        if !self.debounce.accept(generation) {
            self.stats.stale_fires += 1;
            debug!(generation, current = self.debounce.generation(), "Stale debounce fire");
            return;
        }
        if self.state.is_paused() {
            self.stats.stale_fires += 1;
            warn!(state = %self.state, "Debounce fired while paused, ignoring");
            return;
        }

        // The watch must be down before the command can touch anything.
        self.watch.pause();
        self.state = CoordinatorState::PausedRunning;
        self.stats.triggers += 1;
        info!(command = %self.command, "Changes settled, running command");

        match self.executor.run(&self.command, shutdown).await {
            Ok(outcome) if outcome.terminated => {
                info!(duration_ms = outcome.duration.as_millis(), "Command terminated at shutdown");
            }
            Ok(outcome) if outcome.success() => {
                info!(duration_ms = outcome.duration.as_millis(), "Command finished");
            }
            Ok(outcome) => {
                self.stats.failed_triggers += 1;
                warn!(
                    exit_code = ?outcome.exit_code,
                    duration_ms = outcome.duration.as_millis(),
                    "Command failed"
                );
            }
            Err(err) => {
                self.stats.failed_triggers += 1;
                warn!(error = %err, "Command could not be run");
            }
        }

        if shutdown.is_cancelled() {
            return;
        }

        self.state = CoordinatorState::PausedSettling;
        let generation = self.settle.arm(self.settle_interval);
        debug!(generation, settle_ms = self.settle_interval.as_millis(), "Settling before resume");
    }

    fn on_pause_request(&mut self) {
        if self.state.is_paused() {
            debug!(state = %self.state, "Pause requested while paused");
            return;
        }

        self.debounce.cancel();
        self.watch.pause();
        self.state = CoordinatorState::PausedSettling;
        info!("Watch paused by request");
    }

    fn on_resume(&mut self, generation: Option<u64>) -> Result<(), EngineError> {
        match generation {
            Some(generation) => {
                if !self.settle.accept(generation) {
                    self.stats.stale_fires += 1;
                    debug!(generation, "Stale settle fire");
                    return Ok(());
                }
            }
            None => {
                if !self.state.is_paused() {
                    debug!(state = %self.state, "Resume requested while watching");
                    return Ok(());
                }
                self.settle.cancel();
                info!("Watch resumed by request");
            }
        }

        self.watch.resume()?;
        self.state = CoordinatorState::Watching;
        debug!("Watch resumed");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.debounce.cancel();
        self.settle.cancel();
        self.watch.stop();
        info!(
            triggers = self.stats.triggers,
            failed = self.stats.failed_triggers,
            "Coordinator stopped"
        );
    }
}
