//! Exit codes for the `advlock` binary.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 9 | `LOCK_HELD` | Another holder has the lock (`--nonblock`) |
//! | 10 | `LOCK_TIMEOUT` | The lock was not obtained before `--timeout-ms` |
//! | 130 | `CANCELLED` | Waiting was interrupted (Ctrl-C) |
//!
//! `advlock run` otherwise exits with the status of the command it ran.

use advlock_lock::{ContextError, LockError};

/// Process exit code.
///
/// Use the named constants, or [`as_i32()`](Self::as_i32) to get the value
/// for `std::process::exit()`.
///
/// ```rust
/// use advlock::ExitCode;
///
/// assert_eq!(ExitCode::LOCK_HELD.as_i32(), 9);
/// assert_eq!(ExitCode::SUCCESS, ExitCode::from_i32(0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure, including lock I/O errors
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Lock held - a non-blocking attempt found the lock taken
    pub const LOCK_HELD: ExitCode = ExitCode(9);

    /// Lock timeout - the deadline passed while waiting for the lock
    pub const LOCK_TIMEOUT: ExitCode = ExitCode(10);

    /// Cancelled - waiting was interrupted by the user
    pub const CANCELLED: ExitCode = ExitCode(130);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an `ExitCode` from a raw value, e.g. a child's exit status.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl From<&LockError> for ExitCode {
    fn from(err: &LockError) -> Self {
        match err {
            LockError::Context(ContextError::DeadlineExceeded) => ExitCode::LOCK_TIMEOUT,
            LockError::Context(ContextError::Cancelled) => ExitCode::CANCELLED,
            LockError::Open { .. } | LockError::Acquire { .. } | LockError::Release { .. } => {
                ExitCode::INTERNAL
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_exit_code_constants() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::LOCK_HELD.as_i32(), 9);
        assert_eq!(ExitCode::LOCK_TIMEOUT.as_i32(), 10);
        assert_eq!(ExitCode::CANCELLED.as_i32(), 130);
    }

    #[test]
    fn test_round_trip_through_i32() {
        let code = ExitCode::from(42);
        assert_eq!(i32::from(code), 42);
        assert!(!code.is_success());
        assert!(ExitCode::from_i32(0).is_success());
    }

    #[test]
    fn test_context_errors_map_to_wait_codes() {
        let timeout = LockError::Context(ContextError::DeadlineExceeded);
        assert_eq!(ExitCode::from(&timeout), ExitCode::LOCK_TIMEOUT);

        let cancelled = LockError::Context(ContextError::Cancelled);
        assert_eq!(ExitCode::from(&cancelled), ExitCode::CANCELLED);
    }

    #[test]
    fn test_io_errors_map_to_internal() {
        let err = LockError::Open {
            path: PathBuf::from("/nope/app.lock"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(ExitCode::from(&err), ExitCode::INTERNAL);
    }
}
