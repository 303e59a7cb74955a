//! Command-line interface for advlock.
//!
//! `advlock run` holds a lock on a path while a command runs; `advlock probe`
//! reports which lock modes are currently obtainable.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use crate::ExitCode;
use advlock_config::{CliArgs, Config};
use advlock_lock::{Flock, FlockOptions, LockContext, LockError, LockMode};

/// advlock - advisory file locks for shell scripts
#[derive(Parser, Debug)]
#[command(name = "advlock")]
#[command(about = "Run commands under an advisory file lock")]
#[command(long_about = r#"
advlock takes a shared or exclusive advisory lock on a file and holds it while
a command runs. The lock file is created if missing and is never removed.

EXAMPLES:
  # Serialize a cron job
  advlock run /tmp/backup.lock -- ./backup.sh

  # Give up immediately if another run holds the lock (exit 9)
  advlock run /tmp/backup.lock --nonblock -- ./backup.sh

  # Wait at most five seconds, polling every 50ms (exit 10 on timeout)
  advlock run /tmp/backup.lock --timeout-ms 5000 --retry-delay-ms 50 -- ./backup.sh

  # Readers can share the lock
  advlock run /tmp/data.lock --shared -- cat data.db

  # See whether the lock is free right now
  advlock probe /tmp/backup.lock --json

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .advlock/config.toml
  Use --config to specify an explicit config file path

EXIT CODES:
  0 success, 1 internal error, 2 invalid arguments or configuration,
  9 lock held (--nonblock), 10 timed out (--timeout-ms), 130 interrupted.
  Otherwise `run` exits with the command's own status.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Octal permission bits for a newly created lock file (e.g. 600)
    #[arg(long, global = true)]
    pub permissions: Option<String>,

    /// Open the lock file read-write even where read-only would do
    #[arg(long, global = true)]
    pub read_write: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Hold a lock on PATH while running a command
    Run {
        /// Lock file path
        path: PathBuf,

        /// Take a shared lock instead of an exclusive one
        #[arg(long)]
        shared: bool,

        /// Fail immediately with exit code 9 if the lock is held
        #[arg(long, conflicts_with = "timeout_ms")]
        nonblock: bool,

        /// Give up with exit code 10 after this many milliseconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout_ms: Option<u64>,

        /// Polling period while waiting with --timeout-ms
        #[arg(long)]
        retry_delay_ms: Option<u64>,

        /// Command and arguments to run
        #[arg(last = true, required = true, num_args = 1..)]
        command: Vec<OsString>,
    },

    /// Report whether exclusive and shared locks on PATH are obtainable
    Probe {
        /// Lock file path
        path: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// How `run` waits for the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Block the thread until the lock is free.
    Block,
    /// A single attempt.
    NonBlocking,
    /// Poll until the timeout, Ctrl-C cancels.
    Timeout(Duration),
}

impl WaitPolicy {
    #[must_use]
    pub fn from_flags(nonblock: bool, timeout_ms: Option<u64>) -> Self {
        match (nonblock, timeout_ms) {
            (true, _) => Self::NonBlocking,
            (false, Some(ms)) => Self::Timeout(Duration::from_millis(ms)),
            (false, None) => Self::Block,
        }
    }
}

/// Output of `advlock probe`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub path: PathBuf,
    pub exclusive_available: bool,
    pub shared_available: bool,
}

impl ProbeReport {
    fn describe(available: bool) -> &'static str {
        if available { "available" } else { "held" }
    }
}

/// Build the CLI command structure without parsing arguments
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}

/// Main CLI execution function.
///
/// Handles all output including errors. main.rs only maps the returned
/// `ExitCode` to the process status.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    execute(cli)
}

/// Run an already-parsed command line.
pub fn execute(cli: Cli) -> Result<(), ExitCode> {
    let cli_args = cli_args_from(&cli);

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("advlock: configuration error: {err:#}");
            return Err(ExitCode::CLI_ARGS);
        }
    };

    // A second initialisation (e.g. in tests) is harmless.
    let _ = crate::logging::init_tracing(config.verbose());

    if let Some(path) = &config.config_path {
        debug!(config = %path.display(), "loaded configuration");
    }

    let options = match config.flock_options() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("advlock: configuration error: {err}");
            return Err(ExitCode::CLI_ARGS);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("advlock: failed to create async runtime: {err}");
            return Err(ExitCode::INTERNAL);
        }
    };

    match cli.command {
        Commands::Run {
            path,
            shared,
            nonblock,
            timeout_ms,
            command,
            ..
        } => {
            let mode = if shared {
                LockMode::Shared
            } else {
                LockMode::Exclusive
            };
            let wait = WaitPolicy::from_flags(nonblock, timeout_ms);
            execute_run(
                &runtime,
                &path,
                options,
                mode,
                wait,
                config.retry_delay(),
                &command,
            )
        }
        Commands::Probe { path, json } => execute_probe(&path, options, json),
    }
}

fn cli_args_from(cli: &Cli) -> CliArgs {
    let retry_delay_ms = match &cli.command {
        Commands::Run { retry_delay_ms, .. } => *retry_delay_ms,
        Commands::Probe { .. } => None,
    };

    CliArgs {
        config_path: cli.config.clone(),
        retry_delay_ms,
        permissions: cli.permissions.clone(),
        read_write: cli.read_write.then_some(true),
        verbose: cli.verbose.then_some(true),
    }
}

fn execute_run(
    runtime: &Runtime,
    path: &Path,
    options: FlockOptions,
    mode: LockMode,
    wait: WaitPolicy,
    retry_delay: Duration,
    command: &[OsString],
) -> Result<(), ExitCode> {
    let lock = Flock::with_options(path, options);

    match acquire(runtime, &lock, mode, wait, retry_delay) {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("advlock: {lock} is locked");
            return Err(ExitCode::LOCK_HELD);
        }
        Err(err) => {
            eprintln!("advlock: {err}");
            return Err(ExitCode::from(&err));
        }
    }
    info!(path = %lock, %mode, "holding lock");

    let outcome = spawn_and_wait(command);

    if let Err(err) = lock.unlock() {
        eprintln!("advlock: {err}");
        if outcome.is_ok() {
            return Err(ExitCode::INTERNAL);
        }
    }

    match outcome {
        Ok(status) => {
            let code = child_exit_code(status);
            debug!(code = code.as_i32(), "command finished");
            if code.is_success() { Ok(()) } else { Err(code) }
        }
        Err(err) => {
            eprintln!(
                "advlock: failed to run {}: {err}",
                command
                    .first()
                    .map(|program| program.to_string_lossy())
                    .unwrap_or_default()
            );
            Err(ExitCode::INTERNAL)
        }
    }
}

/// Take the lock according to `wait`. `Ok(false)` only for a non-blocking
/// attempt that found the lock held.
fn acquire(
    runtime: &Runtime,
    lock: &Flock,
    mode: LockMode,
    wait: WaitPolicy,
    retry_delay: Duration,
) -> Result<bool, LockError> {
    match wait {
        WaitPolicy::NonBlocking => match mode {
            LockMode::Exclusive => lock.try_lock(),
            LockMode::Shared => lock.try_lock_shared(),
        },
        WaitPolicy::Block => {
            match mode {
                LockMode::Exclusive => lock.lock()?,
                LockMode::Shared => lock.lock_shared()?,
            }
            Ok(true)
        }
        WaitPolicy::Timeout(timeout) => runtime.block_on(async {
            let ctx = LockContext::with_timeout(timeout);
            let canceller = ctx.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    canceller.cancel();
                }
            });

            match mode {
                LockMode::Exclusive => lock.try_lock_context(&ctx, retry_delay).await,
                LockMode::Shared => lock.try_lock_shared_context(&ctx, retry_delay).await,
            }
        }),
    }
}

fn spawn_and_wait(command: &[OsString]) -> std::io::Result<ExitStatus> {
    let Some((program, args)) = command.split_first() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "no command given",
        ));
    };
    Command::new(program).args(args).status()
}

fn child_exit_code(status: ExitStatus) -> ExitCode {
    if let Some(code) = status.code() {
        return ExitCode::from_i32(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitCode::from_i32(128 + signal);
        }
    }

    ExitCode::INTERNAL
}

fn execute_probe(path: &Path, options: FlockOptions, json: bool) -> Result<(), ExitCode> {
    let report = match probe(path, options) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("advlock: {err}");
            return Err(ExitCode::from(&err));
        }
    };

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => {
                eprintln!("advlock: failed to serialize probe report: {err}");
                return Err(ExitCode::INTERNAL);
            }
        }
    } else {
        println!("path: {}", report.path.display());
        println!("exclusive: {}", ProbeReport::describe(report.exclusive_available));
        println!("shared: {}", ProbeReport::describe(report.shared_available));
    }
    Ok(())
}

/// Check both modes with non-blocking attempts, releasing after each.
pub fn probe(path: &Path, options: FlockOptions) -> Result<ProbeReport, LockError> {
    let lock = Flock::with_options(path, options);

    let exclusive_available = lock.try_lock()?;
    lock.unlock()?;
    let shared_available = lock.try_lock_shared()?;
    lock.unlock()?;

    Ok(ProbeReport {
        path: path.to_path_buf(),
        exclusive_available,
        shared_available,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_run_parses_command_after_separator() {
        let cli = parse(&["advlock", "run", "/tmp/x.lock", "--shared", "--", "echo", "-n", "hi"]);
        let Commands::Run {
            path,
            shared,
            command,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(path, PathBuf::from("/tmp/x.lock"));
        assert!(shared);
        let expected: Vec<OsString> = ["echo", "-n", "hi"].into_iter().map(OsString::from).collect();
        assert_eq!(command, expected);
    }

    #[test]
    fn test_run_requires_command() {
        assert!(Cli::try_parse_from(["advlock", "run", "/tmp/x.lock"]).is_err());
    }

    #[test]
    fn test_nonblock_conflicts_with_timeout() {
        let result = Cli::try_parse_from([
            "advlock",
            "run",
            "/tmp/x.lock",
            "--nonblock",
            "--timeout-ms",
            "10",
            "--",
            "true",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result =
            Cli::try_parse_from(["advlock", "run", "/tmp/x.lock", "--timeout-ms", "0", "--", "true"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_wait_policy_from_flags() {
        assert_eq!(WaitPolicy::from_flags(false, None), WaitPolicy::Block);
        assert_eq!(WaitPolicy::from_flags(true, None), WaitPolicy::NonBlocking);
        assert_eq!(
            WaitPolicy::from_flags(false, Some(250)),
            WaitPolicy::Timeout(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_cli_args_only_carry_given_flags() {
        let cli = parse(&["advlock", "probe", "/tmp/x.lock"]);
        let args = cli_args_from(&cli);
        assert_eq!(args.verbose, None);
        assert_eq!(args.read_write, None);
        assert_eq!(args.retry_delay_ms, None);

        let cli = parse(&[
            "advlock",
            "--verbose",
            "--read-write",
            "--permissions",
            "640",
            "run",
            "/tmp/x.lock",
            "--retry-delay-ms",
            "5",
            "--",
            "true",
        ]);
        let args = cli_args_from(&cli);
        assert_eq!(args.verbose, Some(true));
        assert_eq!(args.read_write, Some(true));
        assert_eq!(args.permissions.as_deref(), Some("640"));
        assert_eq!(args.retry_delay_ms, Some(5));
    }

    #[test]
    fn test_probe_free_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("probe.lock");
        let report = probe(&path, FlockOptions::default()).unwrap();
        assert!(report.exclusive_available);
        assert!(report.shared_available);
        assert!(path.exists());
    }

    #[cfg(not(any(target_os = "aix", target_os = "solaris", target_os = "illumos")))]
    #[test]
    fn test_probe_sees_exclusive_holder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("probe.lock");
        let holder = Flock::new(&path);
        assert!(holder.try_lock().unwrap());

        let report = probe(&path, FlockOptions::default()).unwrap();
        assert!(!report.exclusive_available);
        assert!(!report.shared_available);

        holder.unlock().unwrap();
    }

    #[test]
    fn test_probe_report_json_shape() {
        let report = ProbeReport {
            path: PathBuf::from("a.lock"),
            exclusive_available: false,
            shared_available: true,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["exclusive_available"], false);
        assert_eq!(value["shared_available"], true);
        assert_eq!(value["path"], "a.lock");
    }

    #[cfg(unix)]
    #[test]
    fn test_child_exit_code_passthrough() {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(child_exit_code(ExitStatus::from_raw(0)), ExitCode::SUCCESS);
        assert_eq!(child_exit_code(ExitStatus::from_raw(3 << 8)).as_i32(), 3);
        // Killed by SIGKILL.
        assert_eq!(child_exit_code(ExitStatus::from_raw(9)).as_i32(), 137);
    }
}
