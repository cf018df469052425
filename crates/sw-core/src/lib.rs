//! Core configuration and errors for syncwatch.
//!
//! This crate provides the foundational types shared by the workspace:
//!
//! - [`Config`] with its [`WatchConfig`] and [`TriggerConfig`] sections
//! - [`ConfigError`] for fatal configuration problems

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;

pub use config::{
    Config, DEFAULT_DEBOUNCE_SECS, DEFAULT_SETTLE_SECS, MAX_WINDOW_SECS, TriggerConfig, WatchConfig,
};
pub use error::ConfigError;
