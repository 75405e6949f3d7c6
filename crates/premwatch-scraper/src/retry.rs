//! Strategy-level retry with exponential backoff.
//!
//! Only [`ErrorKind::NetworkFailure`](premwatch_core::ErrorKind) is retried
//! (timeouts, connection errors, non-success HTTP statuses). Blocked and
//! parse failures are returned after the first try. Once the run is stopped
//! (cancelled or past its deadline) no further retry is started, and a
//! pending backoff sleep is cut short.

use std::future::Future;
use std::time::Duration;

use crate::error::StrategyFailure;
use crate::pipeline::RunGuard;

/// Runs `operation` with up to `max_retries` additional attempts on retriable failures.
///
/// Returns the final result and the number of attempts made.
///
/// | Attempt | Sleep before next attempt |
/// |---------|---------------------------|
/// | 1       | `backoff_base` × 2⁰       |
/// | 2       | `backoff_base` × 2¹       |
/// | 3       | `backoff_base` × 2²       |
pub async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base: Duration,
    guard: &RunGuard,
    mut operation: F,
) -> (Result<T, StrategyFailure>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StrategyFailure>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return (Ok(value), attempt + 1),
            Err(err) => err,
        };

        if !err.is_retriable() || attempt >= max_retries {
            return (Err(err), attempt + 1);
        }
        if guard.should_stop() {
            tracing::debug!(attempt, error = %err, "run stopped; not retrying strategy");
            return (Err(err), attempt + 1);
        }

        let delay = backoff_base.saturating_mul(1u32 << attempt.min(20));
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient strategy failure, retrying after backoff"
        );

        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            () = guard.stopped() => {
                tracing::debug!(attempt, "run stopped during backoff");
                return (Err(err), attempt + 1);
            }
        }
        attempt += 1;
    }
}
