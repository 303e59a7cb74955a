//! Advisory file locks with shared and exclusive modes.
//!
//! A [`Flock`] is bound to a path and can take an exclusive or shared lock on
//! it, blocking ([`Flock::lock`]), non-blocking ([`Flock::try_lock`]), or by
//! polling under a [`LockContext`] that can be cancelled or given a deadline
//! ([`Flock::try_lock_context`]).
//!
//! The locks are advisory: they only coordinate processes that use the same
//! mechanism and are not a security boundary. The backing file is created on
//! first use, never written to, and never removed.
//!
//! ```no_run
//! use advlock_lock::Flock;
//!
//! let lock = Flock::new("/tmp/app.lock");
//! if lock.try_lock()? {
//!     // ... exclusive work ...
//!     lock.unlock()?;
//! }
//! # Ok::<(), advlock_lock::LockError>(())
//! ```
//!
//! Locking semantics differ between platforms; see the notes on [`Flock`].

mod context;
mod error;
mod handle;
pub mod retry;
mod state;
mod sys;

pub use context::LockContext;
pub use error::{ContextError, LockError};
pub use handle::{Flock, FlockOptions};
pub use retry::{MIN_RETRY_DELAY, try_with_context};
pub use state::{LockMode, LockState};
pub use sys::{DEFAULT_PERMISSIONS, REQUIRES_WRITABLE_DESCRIPTOR};
