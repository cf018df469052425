//! Engine error types.
//!
//! [`ExecError`] covers a single run of the change command and is never
//! fatal to the engine. [`EngineError`] ends [`Coordinator::run`](crate::Coordinator::run).

use thiserror::Error;

/// Errors from running the change command.
///
/// The coordinator logs these and treats them exactly like a non-zero exit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecError {
    /// The command could not be spawned.
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        /// The command line that failed.
        command: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Waiting on the child process failed.
    #[error("failed to wait for command: {0}")]
    Wait(#[source] std::io::Error),
}

impl ExecError {
    /// Creates a new [`ExecError::Spawn`] error.
    #[must_use]
    pub fn spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            command: command.into(),
            source,
        }
    }
}

/// Errors that stop the coordinator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The watch could not be started or resumed.
    #[error("watcher error: {0}")]
    Watch(#[from] sw_watcher::WatchError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use sw_watcher::WatchError;

    #[test]
    fn test_spawn_error_display() {
        let err = ExecError::spawn(
            "pihole-sync",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "failed to spawn 'pihole-sync': no such file");
    }

    #[test]
    fn test_engine_error_from_watch() {
        let err: EngineError = WatchError::path_not_found("/srv/gone").into();
        assert!(matches!(err, EngineError::Watch(WatchError::PathNotFound(_))));
        assert_eq!(err.to_string(), "watcher error: path does not exist: /srv/gone");
    }
}
