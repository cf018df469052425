//! Running the change command.
//!
//! The coordinator awaits [`TriggerExecutor::run`] inline: while it runs the
//! watch is stopped and nothing else happens, so at most one command is ever
//! in flight.
//!
//! [`ShellExecutor`] is the production implementation:
//!
//! - the command line goes through `sh -c` in a fresh process group
//! - stdout and stderr are piped and logged line by line as they arrive
//! - on shutdown the whole group gets SIGTERM, then SIGKILL after a grace
//!   period
//! - the child is `kill_on_drop`, so dropping the future cannot orphan it

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ExecError;

/// Default wait between SIGTERM and SIGKILL at shutdown.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Upper bound on waiting for output readers after the child exits.
///
/// A background grandchild can keep the pipes open forever.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Result of one command run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// Exit code. `None` if the child died from a signal or was terminated.
    pub exit_code: Option<i32>,
    /// Wall time from spawn to exit.
    pub duration: Duration,
    /// The run was cut short by shutdown.
    pub terminated: bool,
}

impl TriggerOutcome {
    /// Outcome of a run that exited on its own.
    #[must_use]
    pub const fn exited(exit_code: Option<i32>, duration: Duration) -> Self {
        Self {
            exit_code,
            duration,
            terminated: false,
        }
    }

    /// Outcome of a run cut short by shutdown.
    #[must_use]
    pub const fn terminated(duration: Duration) -> Self {
        Self {
            exit_code: None,
            duration,
            terminated: true,
        }
    }

    /// Returns `true` for a clean zero exit.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0)) && !self.terminated
    }
}

/// Runs the change command to completion.
pub trait TriggerExecutor: Send + 'static {
    /// Runs `command` and waits for it.
    ///
    /// When `cancel` fires the implementation must stop the command within
    /// a bounded time and report [`TriggerOutcome::terminated`].
    ///
    /// # Errors
    ///
    /// Returns [`ExecError`] if the command could not be started or waited
    /// on. The coordinator treats this like a failed run.
    fn run(
        &mut self,
        command: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<TriggerOutcome, ExecError>> + Send;
}

/// Executor that runs the command through a POSIX shell.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
    grace: Duration,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self {
            shell: "sh".to_owned(),
            grace: DEFAULT_GRACE,
        }
    }
}

impl ShellExecutor {
    /// Creates an executor using `sh` and the default grace period.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wait between SIGTERM and SIGKILL at shutdown.
    #[must_use]
    pub const fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Sets the shell binary (invoked as `<shell> -c <command>`).
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Returns the grace period.
    #[must_use]
    pub const fn grace(&self) -> Duration {
        self.grace
    }

    fn spawn(&self, command: &str) -> Result<Child, ExecError> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        cmd.spawn().map_err(|source| ExecError::spawn(command, source))
    }

    /// SIGTERM the group, wait out the grace period, then SIGKILL.
    async fn terminate(&self, child: &mut Child) -> Result<ExitStatus, ExecError> {
        let pid = child.id();
        info!(pid, grace_ms = self.grace.as_millis(), "Terminating change command");
        signal_group(pid, GroupSignal::Terminate);

        if let Ok(status) = tokio::time::timeout(self.grace, child.wait()).await {
            return status.map_err(ExecError::Wait);
        }

        warn!(pid, "Change command ignored SIGTERM, killing");
        signal_group(pid, GroupSignal::Kill);
        if let Err(error) = child.start_kill() {
            debug!(error = %error, "Direct kill failed");
        }
        child.wait().await.map_err(ExecError::Wait)
    }
}

impl TriggerExecutor for ShellExecutor {
    async fn run(
        &mut self,
        command: &str,
        cancel: &CancellationToken,
    ) -> Result<TriggerOutcome, ExecError> {
        let started = Instant::now();
        let mut child = self.spawn(command)?;
        info!(pid = child.id(), command, "Running change command");

        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(log_lines(out, Stream::Stdout)));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(log_lines(err, Stream::Stderr)));

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            () = cancel.cancelled() => None,
        };

        let outcome = match waited {
            Some(status) => {
                let status = status.map_err(ExecError::Wait)?;
                TriggerOutcome::exited(status.code(), started.elapsed())
            }
            None => {
                let status = self.terminate(&mut child).await?;
                debug!(?status, "Change command terminated");
                TriggerOutcome::terminated(started.elapsed())
            }
        };

        let drain_deadline = Instant::now() + OUTPUT_DRAIN_TIMEOUT;
        drain(stdout, drain_deadline).await;
        drain(stderr, drain_deadline).await;

        Ok(outcome)
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    const fn name(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

async fn log_lines<R: AsyncRead + Unpin>(reader: R, stream: Stream) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match stream {
                Stream::Stdout => info!(stream = stream.name(), "{line}"),
                Stream::Stderr => warn!(stream = stream.name(), "{line}"),
            },
            Ok(None) => break,
            Err(error) => {
                debug!(stream = stream.name(), error = %error, "Stopped reading command output");
                break;
            }
        }
    }
}

async fn drain(reader: Option<JoinHandle<()>>, deadline: Instant) {
    let Some(mut reader) = reader else {
        return;
    };
    if tokio::time::timeout_at(deadline, &mut reader)
        .await
        .is_err()
    {
        debug!("Command output still open, detaching reader");
        reader.abort();
    }
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: Option<u32>, signal: GroupSignal) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    let signal = match signal {
        GroupSignal::Terminate => Signal::SIGTERM,
        GroupSignal::Kill => Signal::SIGKILL,
    };
    // The child was spawned with process_group(0), so its pid is the pgid.
    if let Err(errno) = killpg(Pid::from_raw(pid), signal) {
        warn!(pid, ?signal, error = %errno, "Failed to signal change command");
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: Option<u32>, _signal: GroupSignal) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success() {
        let ok = TriggerOutcome::exited(Some(0), Duration::from_millis(10));
        assert!(ok.success());

        let failed = TriggerOutcome::exited(Some(1), Duration::from_millis(10));
        assert!(!failed.success());

        let signalled = TriggerOutcome::exited(None, Duration::from_millis(10));
        assert!(!signalled.success());

        let terminated = TriggerOutcome::terminated(Duration::from_secs(1));
        assert!(terminated.terminated);
        assert_eq!(terminated.exit_code, None);
        assert!(!terminated.success());
    }

    #[test]
    fn test_shell_executor_builder() {
        let executor = ShellExecutor::new().with_grace(Duration::from_millis(250));
        assert_eq!(executor.grace(), Duration::from_millis(250));
        assert_eq!(ShellExecutor::default().grace(), DEFAULT_GRACE);
    }

    #[tokio::test]
    async fn test_missing_shell_is_spawn_error() {
        let mut executor = ShellExecutor::new().with_shell("/nonexistent/syncwatch-sh");
        let err = executor
            .run("true", &CancellationToken::new())
            .await
            .expect_err("spawn must fail");
        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
