//! Cancellation and deadline signal for cancellable lock acquisition.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

use crate::error::ContextError;

/// A cloneable "stop waiting" signal.
///
/// A context finishes either when [`cancel`](Self::cancel) is called on any
/// clone or when its deadline passes. The first cause wins: a context that is
/// cancelled before its deadline keeps reporting [`ContextError::Cancelled`]
/// after the deadline has gone by.
#[derive(Debug, Clone)]
pub struct LockContext {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    deadline: Option<Instant>,
    done: watch::Sender<Option<ContextError>>,
}

impl LockContext {
    /// A context that only finishes when cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self::build(None)
    }

    /// A context whose deadline is `timeout` from now.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::build(Instant::now().checked_add(timeout))
    }

    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::build(Some(deadline))
    }

    fn build(deadline: Option<Instant>) -> Self {
        let (done, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner { deadline, done }),
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Cancel the context. Has no effect if it already finished.
    ///
    /// A deadline that has already passed still wins, even if nothing
    /// observed it before this call.
    pub fn cancel(&self) {
        let reason = if self.deadline_passed() {
            ContextError::DeadlineExceeded
        } else {
            ContextError::Cancelled
        };
        self.finish(reason);
    }

    /// Why the context finished, or `None` while it is still live.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if self.deadline_passed() {
            self.finish(ContextError::DeadlineExceeded);
        }
        *self.inner.done.borrow()
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolve once the context finishes, yielding the reason.
    pub async fn done(&self) -> ContextError {
        let mut changes = self.inner.done.subscribe();
        loop {
            if let Some(err) = self.err() {
                return err;
            }
            match self.inner.deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = changes.changed() => {}
                        () = sleep_until(deadline.min(far_future())) => {}
                    }
                }
                None => {
                    // The sender lives in `self`, so the channel cannot close
                    // while we wait on it.
                    if changes.changed().await.is_err() {
                        return ContextError::Cancelled;
                    }
                }
            }
        }
    }

    fn deadline_passed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn finish(&self, reason: ContextError) {
        self.inner.done.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }
}

/// Upper bound for a single timer wait; the loop in `done` re-arms past it.
fn far_future() -> Instant {
    let now = Instant::now();
    now.checked_add(FAR_FUTURE).unwrap_or(now)
}

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

impl Default for LockContext {
    fn default() -> Self {
        Self::background()
    }
}
