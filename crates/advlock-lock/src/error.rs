//! Error types for lock operations.

use std::io;
use std::path::PathBuf;

use crate::state::LockMode;

/// Why a cancellable wait stopped before the lock was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// The context was cancelled explicitly.
    #[error("context canceled")]
    Cancelled,

    /// The context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Errors returned by [`Flock`](crate::Flock) operations.
///
/// Contention is never an error: a non-blocking attempt that would block is
/// reported as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Failed to open lock file '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to acquire {mode} lock on '{}': {source}", .path.display())]
    Acquire {
        path: PathBuf,
        mode: LockMode,
        #[source]
        source: io::Error,
    },

    #[error("Failed to release lock on '{}': {source}", .path.display())]
    Release {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Context(#[from] ContextError),
}

impl LockError {
    /// The underlying OS error, if this error came from a syscall.
    #[must_use]
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Self::Open { source, .. } | Self::Acquire { source, .. } | Self::Release { source, .. } => {
                Some(source)
            }
            Self::Context(_) => None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Context(ContextError::Cancelled))
    }

    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::Context(ContextError::DeadlineExceeded))
    }
}
