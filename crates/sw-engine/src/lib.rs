//! Debounce, pause and trigger engine for syncwatch.
//!
//! The engine watches a directory through [`sw_watcher`], waits for a burst
//! of changes to go quiet, then runs a shell command with the watch switched
//! off so the command's own writes never trigger it again. After the command
//! finishes the watch stays off for a settle window before resuming.
//!
//! # Components
//!
//! - [`SignalRouter`] / [`SignalSender`]: the unbounded queue every producer
//!   posts into
//! - [`DebounceTimer`]: single-slot cancel-and-restart timer, used for both
//!   the debounce and the settle window
//! - [`TriggerExecutor`] / [`ShellExecutor`]: runs the command
//! - [`Coordinator`]: the state machine tying them together
//!
//! # Usage
//!
//! ```no_run
//! use sw_core::Config;
//! use sw_engine::{Coordinator, ShellExecutor};
//! use sw_watcher::NotifySource;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::new("/etc/pihole", "pihole-sync push").validate()?;
//! let coordinator = Coordinator::new(&config, NotifySource::new(), ShellExecutor::new())?;
//!
//! let shutdown = CancellationToken::new();
//! let stats = coordinator.run(shutdown).await?;
//! println!("{} runs", stats.triggers);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod executor;
pub mod router;

pub use coordinator::{Coordinator, CoordinatorState, CoordinatorStats};
pub use debounce::{DebounceState, DebounceTimer};
pub use error::{EngineError, ExecError};
pub use executor::{DEFAULT_GRACE, ShellExecutor, TriggerExecutor, TriggerOutcome};
pub use router::{Signal, SignalRouter, SignalSender};
