//! The lock handle: state bookkeeping, descriptor lifecycle and acquisition.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::{debug, warn};

use crate::context::LockContext;
use crate::error::LockError;
use crate::retry::try_with_context;
use crate::state::{LockMode, LockState};
use crate::sys;

/// How the backing file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlockOptions {
    /// Permission bits for a newly created lock file (unix only).
    pub permissions: u32,
    /// Open read-write instead of read-only.
    pub read_write: bool,
}

impl Default for FlockOptions {
    fn default() -> Self {
        Self {
            permissions: sys::DEFAULT_PERMISSIONS,
            read_write: sys::REQUIRES_WRITABLE_DESCRIPTOR,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: LockState,
    /// Open while a lock is held or an attempt is in flight.
    file: Option<Arc<File>>,
}

/// An advisory lock on a file path.
///
/// The handle can be shared between threads (`&Flock` is enough for every
/// operation). Handles are independent: two `Flock`s on the same path each
/// keep their own state and contend only through the OS, exactly like two
/// processes would.
///
/// Nothing is written to the lock file and it is never deleted.
///
/// # Platform notes
///
/// * Converting a held lock (shared to exclusive or back) reissues the lock
///   call on the same descriptor. With `flock(2)` the conversion is not
///   atomic: another process may get the lock in between, and a failed
///   attempt may already have dropped the old lock. A conversion that fails
///   therefore leaves the handle unlocked with its descriptor closed.
/// * On AIX, Solaris and illumos locks are POSIX record locks owned by the
///   process. Two handles of one process on the same file do not exclude each
///   other, and unlocking or dropping one of them releases the other's lock.
///   Do not rely on two same-process handles holding a shared lock at once on
///   those targets.
///
/// # Drop
///
/// Dropping a handle closes its descriptor, which the OS treats as a release.
/// Call [`unlock`](Self::unlock) explicitly; a handle dropped while still
/// holding a lock logs a warning.
pub struct Flock {
    path: PathBuf,
    options: FlockOptions,
    /// Serializes OS-level operations on the descriptor. Held across blocking
    /// lock calls; `inner` is not, so state queries never wait on a blocked
    /// acquirer.
    ops: Mutex<()>,
    inner: RwLock<Inner>,
}

impl Flock {
    /// Create an unlocked handle for `path`. The filesystem is not touched.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, FlockOptions::default())
    }

    #[must_use]
    pub fn with_options(path: impl Into<PathBuf>, options: FlockOptions) -> Self {
        Self {
            path: path.into(),
            options,
            ops: Mutex::new(()),
            inner: RwLock::new(Inner::default()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn options(&self) -> FlockOptions {
        self.options
    }

    /// Whether this handle holds the exclusive lock.
    ///
    /// This is a snapshot; another thread may change it right after.
    #[must_use]
    pub fn is_exclusively_locked(&self) -> bool {
        self.read_inner().state.is_exclusive()
    }

    /// Whether this handle holds a shared lock.
    ///
    /// This is a snapshot; another thread may change it right after.
    #[must_use]
    pub fn is_shared_locked(&self) -> bool {
        self.read_inner().state.is_shared()
    }

    #[must_use]
    pub fn state(&self) -> LockState {
        self.read_inner().state
    }

    /// Try to take the exclusive lock without blocking.
    ///
    /// Returns `Ok(false)` when someone else holds the lock. Returns
    /// `Ok(true)` straight away, without a syscall, if this handle already
    /// holds it.
    pub fn try_lock(&self) -> Result<bool, LockError> {
        self.try_acquire(LockMode::Exclusive)
    }

    /// Try to take a shared lock without blocking.
    pub fn try_lock_shared(&self) -> Result<bool, LockError> {
        self.try_acquire(LockMode::Shared)
    }

    /// Take the exclusive lock, blocking the thread until it is available.
    ///
    /// Not cancellable; use [`try_lock_context`](Self::try_lock_context) for
    /// a bounded wait.
    pub fn lock(&self) -> Result<(), LockError> {
        self.acquire(LockMode::Exclusive)
    }

    /// Take a shared lock, blocking the thread until it is available.
    pub fn lock_shared(&self) -> Result<(), LockError> {
        self.acquire(LockMode::Shared)
    }

    /// Poll [`try_lock`](Self::try_lock) every `retry_delay` until it
    /// succeeds, fails, or `ctx` finishes.
    pub async fn try_lock_context(
        &self,
        ctx: &LockContext,
        retry_delay: Duration,
    ) -> Result<bool, LockError> {
        try_with_context(ctx, retry_delay, || self.try_lock()).await
    }

    /// Poll [`try_lock_shared`](Self::try_lock_shared) every `retry_delay`
    /// until it succeeds, fails, or `ctx` finishes.
    pub async fn try_lock_shared_context(
        &self,
        ctx: &LockContext,
        retry_delay: Duration,
    ) -> Result<bool, LockError> {
        try_with_context(ctx, retry_delay, || self.try_lock_shared()).await
    }

    /// Release whatever lock this handle holds and close its descriptor.
    ///
    /// A no-op on an unlocked handle. If the OS reports an unlock error it is
    /// returned, but the handle is reset to unlocked regardless.
    pub fn unlock(&self) -> Result<(), LockError> {
        let _ops = self.lock_ops();
        let mut inner = self.write_inner();
        if !inner.state.is_held() {
            inner.file = None;
            return Ok(());
        }

        let previous = inner.state;
        let result = match inner.file.as_deref() {
            Some(file) => sys::unlock(file),
            None => Ok(()),
        };
        inner.state = LockState::Unlocked;
        inner.file = None;
        drop(inner);

        match result {
            Ok(()) => {
                debug!(path = %self.path.display(), released = %previous, "lock released");
                Ok(())
            }
            Err(source) => Err(LockError::Release {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Same as [`unlock`](Self::unlock). The lock file is left on disk.
    pub fn close(&self) -> Result<(), LockError> {
        self.unlock()
    }

    fn try_acquire(&self, mode: LockMode) -> Result<bool, LockError> {
        let _ops = self.lock_ops();
        if self.read_inner().state.holds(mode) {
            return Ok(true);
        }

        let mut file = self.ensure_open()?;
        let mut outcome = sys::try_lock(&file, mode);
        if let Err(err) = &outcome
            && let Some(reopened) = self.reopen_read_write(err)
        {
            file = reopened;
            outcome = sys::try_lock(&file, mode);
        }

        match outcome {
            Ok(true) => {
                self.write_inner().state = mode.into();
                debug!(path = %self.path.display(), %mode, "lock acquired");
                Ok(true)
            }
            Ok(false) => {
                self.abandon_conversion(mode);
                self.release_if_idle();
                Ok(false)
            }
            Err(source) => {
                self.abandon_conversion(mode);
                self.release_if_idle();
                Err(LockError::Acquire {
                    path: self.path.clone(),
                    mode,
                    source,
                })
            }
        }
    }

    fn acquire(&self, mode: LockMode) -> Result<(), LockError> {
        let _ops = self.lock_ops();
        if self.read_inner().state.holds(mode) {
            return Ok(());
        }

        let mut file = self.ensure_open()?;
        debug!(path = %self.path.display(), %mode, "waiting for lock");
        let mut outcome = sys::lock(&file, mode);
        if let Err(err) = &outcome
            && let Some(reopened) = self.reopen_read_write(err)
        {
            file = reopened;
            outcome = sys::lock(&file, mode);
        }

        match outcome {
            Ok(()) => {
                self.write_inner().state = mode.into();
                debug!(path = %self.path.display(), %mode, "lock acquired");
                Ok(())
            }
            Err(source) => {
                self.abandon_conversion(mode);
                self.release_if_idle();
                Err(LockError::Acquire {
                    path: self.path.clone(),
                    mode,
                    source,
                })
            }
        }
    }

    /// Forget a held lock after a failed attempt to convert it. `flock(2)`
    /// releases the old lock before trying the new mode, so the handle can no
    /// longer claim either; closing the descriptor makes that true everywhere.
    fn abandon_conversion(&self, requested: LockMode) {
        let mut inner = self.write_inner();
        if inner.state.is_held() {
            debug!(
                path = %self.path.display(),
                held = %inner.state,
                %requested,
                "lock conversion failed, releasing handle"
            );
            inner.state = LockState::Unlocked;
        }
    }

    /// Return the open descriptor, opening the lock file if needed.
    ///
    /// Must be called with `ops` held so the descriptor cannot be closed
    /// while the returned clone is in use.
    fn ensure_open(&self) -> Result<Arc<File>, LockError> {
        let mut inner = self.write_inner();
        if let Some(file) = &inner.file {
            return Ok(Arc::clone(file));
        }

        let file = sys::open(&self.path, self.options.read_write, self.options.permissions)
            .map_err(|source| LockError::Open {
                path: self.path.clone(),
                source,
            })?;
        debug!(
            path = %self.path.display(),
            read_write = self.options.read_write,
            "opened lock file"
        );
        let file = Arc::new(file);
        inner.file = Some(Arc::clone(&file));
        Ok(file)
    }

    /// Close the descriptor if no lock is held. Close errors are ignored.
    fn release_if_idle(&self) {
        let mut inner = self.write_inner();
        if !inner.state.is_held() {
            inner.file = None;
        }
    }

    /// Swap a read-only descriptor for a read-write one after an error that
    /// calls for it. Only done while no lock is held, since closing the old
    /// descriptor would drop that lock.
    fn reopen_read_write(&self, err: &io::Error) -> Option<Arc<File>> {
        if self.options.read_write || !sys::wants_read_write_reopen(err) {
            return None;
        }
        let mut inner = self.write_inner();
        if inner.state.is_held() {
            return None;
        }
        match sys::open(&self.path, true, self.options.permissions) {
            Ok(file) => {
                debug!(path = %self.path.display(), error = %err, "reopened lock file read-write");
                let file = Arc::new(file);
                inner.file = Some(Arc::clone(&file));
                Some(file)
            }
            Err(reopen_err) => {
                debug!(
                    path = %self.path.display(),
                    error = %reopen_err,
                    "read-write reopen failed"
                );
                None
            }
        }
    }

    #[cfg(test)]
    fn has_descriptor(&self) -> bool {
        self.read_inner().file.is_some()
    }

    fn lock_ops(&self) -> MutexGuard<'_, ()> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Display for Flock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl fmt::Debug for Flock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flock")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for Flock {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if inner.state.is_held() {
            warn!(
                path = %self.path.display(),
                state = %inner.state,
                "lock handle dropped while holding a lock; closing its descriptor"
            );
        }
    }
}
