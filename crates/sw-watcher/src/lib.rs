//! Pausable recursive file watcher.
//!
//! This crate turns raw filesystem notifications under one root directory
//! into [`ChangeEvent`]s, and lets its owner stop and restart the watch at
//! any time without leaking events from a stopped session.
//!
//! # Overview
//!
//! The sw-watcher crate is designed to:
//!
//! - Watch a directory tree recursively through the `notify` crate
//! - Admit only created, modified and moved files (no directories, no
//!   removals, no metadata-only changes)
//! - Filter paths with `WATCH_INCLUDE`/`WATCH_EXCLUDE` regular expressions
//! - Drop notifications for files whose modification time and size did not
//!   change
//! - Hand survivors to an [`EventSink`] without blocking the notify thread
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  start/stop   ┌──────────────┐  offer   ┌─────────────┐
//! │ WatchController  │ ────────────► │ WatchSource  │ ───────► │ SessionSink │
//! │ (session owner)  │               │ (notify)     │          │ (admission) │
//! └──────────────────┘               └──────────────┘          └──────┬──────┘
//!                                                                     │ deliver
//!                                                                     ▼
//!                                                               EventSink
//! ```
//!
//! # Crate Dependencies
//!
//! ```text
//! sw-cli ──► sw-engine ──► sw-watcher ──► sw-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::mpsc;
//! use sw_watcher::{NotifySource, PatternFilter, WatchController};
//!
//! # fn example() -> Result<(), sw_watcher::WatchError> {
//! let (tx, rx) = mpsc::channel();
//! let filter = PatternFilter::new(Some(r"\.list$"), None)?;
//! let mut controller = WatchController::new(NotifySource::new(), "/etc/pihole", filter, tx);
//!
//! controller.start()?;
//! if let Ok(event) = rx.recv() {
//!     println!("{} {}", event.kind, event.path);
//! }
//! controller.stop();
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Failing to start a session is fatal and returned as a [`WatchError`].
//! Errors reported by a running watch are logged and watching continues.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod controller;
pub mod detector;
pub mod error;
pub mod events;
pub mod filter;
pub mod sink;
pub mod source;

pub use controller::WatchController;
pub use detector::ChangeDetector;
pub use error::WatchError;
pub use events::{ChangeEvent, ChangeKind};
pub use filter::{FileFilter, PatternFilter};
pub use sink::{EventSink, SessionSink};
pub use source::{NotifySource, WatchSource};
