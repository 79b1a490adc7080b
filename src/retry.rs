//! Bounded, time-sliced retry.
//!
//! [`retry`] invokes an operation immediately and then once per tick until it
//! succeeds or the window closes. [`retry_with_ctx`] adds an attempt counter
//! and cooperative cancellation. Both helpers are pure; no endpoint state is
//! involved.

use driftsync_types::{EndpointError, EndpointResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Default re-invocation interval (1s)
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Default overall window (30s)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tick and overall window for a retry loop.
///
/// Convertible from nothing (defaults), a bare tick, or a `(tick, timeout)`
/// pair, so call sites can override only what they need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTiming {
    pub tick: Duration,
    pub timeout: Duration,
}

impl Default for RetryTiming {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl From<()> for RetryTiming {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Duration> for RetryTiming {
    fn from(tick: Duration) -> Self {
        Self {
            tick,
            ..Self::default()
        }
    }
}

impl From<(Duration, Duration)> for RetryTiming {
    fn from((tick, timeout): (Duration, Duration)) -> Self {
        Self { tick, timeout }
    }
}

/// Apply an operation as many times as required.
///
/// `f` runs once immediately; on failure it runs again at every tick. Returns
/// `Ok(())` on the first success, the last tick error when the window closes,
/// or [`EndpointError::Timeout`] if no tick ever completed.
pub async fn retry<F, Fut>(mut f: F, timing: impl Into<RetryTiming>) -> EndpointResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EndpointResult<()>>,
{
    let timing = timing.into();
    if f().await.is_ok() {
        return Ok(());
    }

    let deadline = Instant::now() + timing.timeout;
    let mut ticker = interval_at(Instant::now() + timing.tick, timing.tick);
    let mut last_err: Option<EndpointError> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match f().await {
                    Ok(()) => return Ok(()),
                    Err(e) => last_err = Some(e),
                }
            }
            _ = sleep_until(deadline) => {
                return Err(last_err.unwrap_or(EndpointError::Timeout));
            }
        }
    }
}

/// Like [`retry`] with an attempt counter and cooperative cancellation.
///
/// Cancellation returns the last captured error if any, else
/// [`EndpointError::Cancelled`].
pub async fn retry_with_ctx<F, Fut>(
    ctx: &CancellationToken,
    mut f: F,
    timing: impl Into<RetryTiming>,
) -> EndpointResult<()>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = EndpointResult<()>>,
{
    let timing = timing.into();
    let mut attempt: u32 = 0;
    if f(attempt).await.is_ok() {
        return Ok(());
    }

    let deadline = Instant::now() + timing.timeout;
    let mut ticker = interval_at(Instant::now() + timing.tick, timing.tick);
    let mut last_err: Option<EndpointError> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match f(attempt).await {
                    Ok(()) => return Ok(()),
                    Err(e) => last_err = Some(e),
                }
                attempt += 1;
            }
            _ = sleep_until(deadline) => {
                return Err(last_err.unwrap_or(EndpointError::Timeout));
            }
            _ = ctx.cancelled() => {
                return Err(last_err.unwrap_or(EndpointError::Cancelled));
            }
        }
    }
}
