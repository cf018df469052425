//! CLI entry point for the syncwatch daemon.
//!
//! Watches a directory tree and runs a command once changes go quiet,
//! pausing the watch while the command runs and for a settle window after.
//!
//! # Usage
//!
//! ```bash
//! # Everything from the environment
//! WATCH_DIR=/etc/pihole ONCHANGE_CMD='pihole-sync push' syncwatch
//!
//! # Or from flags
//! syncwatch --watch-dir /etc/pihole --include '\.(conf|list)$' \
//!     --debounce-time 5 --onchange-cmd 'pihole-sync push'
//!
//! # Show the resolved configuration
//! syncwatch --watch-dir /etc/pihole --onchange-cmd true --print-config
//! ```
//!
//! # Signals
//!
//! - `SIGINT`, `SIGTERM`: shut down, terminating a running command
//! - `SIGUSR1`: pause the watch until `SIGUSR2`
//! - `SIGUSR2`: resume the watch

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use sw_core::{Config, DEFAULT_DEBOUNCE_SECS, DEFAULT_SETTLE_SECS, TriggerConfig, WatchConfig};
use sw_engine::{Coordinator, ShellExecutor, SignalSender};
use sw_watcher::{NotifySource, PatternFilter};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Run a command when files change, without reacting to the command's own
/// writes.
///
/// Every option can also be given through the environment variable shown.
#[derive(Debug, Parser)]
#[command(name = "syncwatch", version, about, long_about = None)]
struct Cli {
    /// Directory to watch recursively.
    #[arg(long, env = "WATCH_DIR")]
    watch_dir: Utf8PathBuf,

    /// Regular expression a path must match to count as a change.
    #[arg(long, env = "WATCH_INCLUDE")]
    include: Option<String>,

    /// Regular expression that excludes a path (wins over --include).
    #[arg(long, env = "WATCH_EXCLUDE")]
    exclude: Option<String>,

    /// Seconds of quiet after the last change before running the command.
    #[arg(long, env = "DEBOUNCE_TIME", default_value_t = DEFAULT_DEBOUNCE_SECS, allow_negative_numbers = true)]
    debounce_time: f64,

    /// Shell command line to run when changes settle.
    #[arg(long, env = "ONCHANGE_CMD")]
    onchange_cmd: String,

    /// Seconds to keep the watch paused after the command finishes.
    #[arg(long, env = "ONCHANGE_CMD_TIME", default_value_t = DEFAULT_SETTLE_SECS, allow_negative_numbers = true)]
    onchange_cmd_time: f64,

    /// Enable verbose logging (debug level).
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,

    /// Print the validated configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// `notify` is filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn"))
    });

    let use_ansi = !no_color && std::env::var_os("NO_COLOR").is_none();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Builds and validates a [`Config`] from CLI arguments.
///
/// # Errors
///
/// Returns an error if the watch directory is unusable, the command is
/// blank, a duration is invalid or a pattern does not compile.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let config = Config {
        watch: WatchConfig {
            root: cli.watch_dir.clone(),
            include: cli.include.clone(),
            exclude: cli.exclude.clone(),
        },
        trigger: TriggerConfig {
            command: cli.onchange_cmd.clone(),
            debounce_secs: cli.debounce_time,
            settle_secs: cli.onchange_cmd_time,
        },
    };

    let config = config.validate()?;
    PatternFilter::from_config(&config.watch)?;
    Ok(config)
}

/// Writes the configuration as pretty JSON to stdout.
fn print_config(config: &Config) -> color_eyre::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}")?;
    Ok(())
}

// =============================================================================
// SIGNAL HANDLING
// =============================================================================

/// Forwards OS signals: termination cancels `shutdown`, `SIGUSR1`/`SIGUSR2`
/// pause and resume the watch.
///
/// The task ends once `shutdown` is cancelled from either side.
#[cfg(unix)]
fn spawn_signal_handler(
    shutdown: CancellationToken,
    sender: SignalSender,
) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;
    let mut sigusr2 = signal(SignalKind::user_defined2())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                    break;
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    break;
                }
                _ = sigusr1.recv() => {
                    info!("Received SIGUSR1, pausing watch");
                    sender.pause();
                }
                _ = sigusr2.recv() => {
                    info!("Received SIGUSR2, resuming watch");
                    sender.resume();
                }
            }
        }
        shutdown.cancel();
    }))
}

#[cfg(not(unix))]
fn spawn_signal_handler(
    shutdown: CancellationToken,
    _sender: SignalSender,
) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        tokio::select! {
            () = shutdown.cancelled() => {}
            _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C, shutting down"),
        }
        shutdown.cancel();
    }))
}

// =============================================================================
// COMMAND IMPLEMENTATION
// =============================================================================

/// Runs the daemon until a termination signal arrives.
///
/// # Errors
///
/// Returns an error if the watch cannot be started or resumed.
async fn run(config: Config) -> color_eyre::Result<()> {
    info!(
        path = %config.watch.root,
        include = config.watch.include.as_deref(),
        exclude = config.watch.exclude.as_deref(),
        command = %config.trigger.command,
        "Starting syncwatch"
    );

    let coordinator = Coordinator::new(&config, NotifySource::new(), ShellExecutor::new())?;
    let shutdown = CancellationToken::new();
    let signals = spawn_signal_handler(shutdown.clone(), coordinator.sender())?;

    let result = coordinator.run(shutdown.clone()).await;

    shutdown.cancel();
    signals.await?;

    let stats = result?;
    info!(
        triggers = stats.triggers,
        failed = stats.failed_triggers,
        suppressed = stats.suppressed_events,
        "syncwatch stopped"
    );
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments (flags or environment)
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Validate configuration; any problem here is fatal
    let config = build_config(&cli)?;

    if cli.print_config {
        return print_config(&config);
    }

    run(config).await
}
