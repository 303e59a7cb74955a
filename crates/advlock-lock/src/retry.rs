//! Polling driver that turns a non-blocking attempt into a cancellable wait.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::trace;

use crate::context::LockContext;
use crate::error::LockError;

/// Smallest accepted polling period; a zero delay is clamped to this.
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Largest polling period. Longer delays are clamped so the schedule stays
/// representable; the context still bounds the wait.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(86_400 * 365);

/// Call `attempt` until it succeeds, fails, or `ctx` finishes.
///
/// The first attempt runs immediately. After each `Ok(false)` the driver
/// waits for the next tick of a fixed `retry_delay` schedule, or for the
/// context, whichever comes first. The schedule is created once per call, so
/// attempts are spaced at least `retry_delay` apart without drifting.
///
/// A context that is already finished returns its error without calling
/// `attempt` at all. `Ok(true)` and `Err(_)` from `attempt` are returned as-is.
pub async fn try_with_context<F>(
    ctx: &LockContext,
    retry_delay: Duration,
    mut attempt: F,
) -> Result<bool, LockError>
where
    F: FnMut() -> Result<bool, LockError>,
{
    if let Some(err) = ctx.err() {
        return Err(err.into());
    }

    let period = retry_delay.clamp(MIN_RETRY_DELAY, MAX_RETRY_DELAY);
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempts: u64 = 0;
    loop {
        attempts += 1;
        if attempt()? {
            trace!(attempts, "lock obtained");
            return Ok(true);
        }
        trace!(attempts, ?period, "lock busy, waiting for next attempt");

        tokio::select! {
            biased;
            err = ctx.done() => return Err(err.into()),
            _ = ticks.tick() => {}
        }
    }
}
