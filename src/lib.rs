//! advlock - advisory file locks with shared and exclusive modes
//!
//! advlock can be used in two ways:
//! - **CLI**: run a command while holding a lock on a file
//! - **Library**: take and release locks from Rust code
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Serialize a job; waits for any other holder
//! advlock run /tmp/job.lock -- ./job.sh
//!
//! # Skip the run if the lock is taken (exit code 9)
//! advlock run /tmp/job.lock --nonblock -- ./job.sh
//!
//! # Wait at most two seconds (exit code 10 on timeout)
//! advlock run /tmp/job.lock --timeout-ms 2000 -- ./job.sh
//!
//! # Inspect a lock
//! advlock probe /tmp/job.lock --json
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use advlock::{Flock, LockContext};
//!
//! # async fn demo() -> Result<(), advlock::LockError> {
//! let lock = Flock::new("/tmp/job.lock");
//!
//! let ctx = LockContext::with_timeout(Duration::from_secs(2));
//! if lock.try_lock_context(&ctx, Duration::from_millis(50)).await? {
//!     // ... exclusive work ...
//!     lock.unlock()?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Crates
//!
//! - `advlock-lock`: the [`Flock`] handle, [`LockContext`] and the polling
//!   driver. Re-exported here.
//! - `advlock-config`: `.advlock/config.toml` discovery and the
//!   [`Config`] model used by the CLI.

pub mod cli;
mod exit_codes;
pub mod logging;

pub use exit_codes::ExitCode;

pub use advlock_lock::{
    ContextError, DEFAULT_PERMISSIONS, Flock, FlockOptions, LockContext, LockError, LockMode,
    LockState, MIN_RETRY_DELAY, REQUIRES_WRITABLE_DESCRIPTOR, try_with_context,
};

pub use advlock_config::{CliArgs, Config, ConfigBuilder, ConfigError, ConfigSource};
