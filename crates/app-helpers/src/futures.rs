use std::time::Duration;

pub use tryhard;
use tryhard::{backoff_strategies::FixedBackoff, NoOnRetry, RetryFuture};

/// Run `f` up to `attempts` times in total, sleeping `delay` between tries.
///
/// `attempts` of 0 is treated as 1.
pub fn retry_fixed<F, Fut, T, E>(
    attempts: u32,
    delay: Duration,
    f: F,
) -> RetryFuture<F, Fut, FixedBackoff, NoOnRetry>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    tryhard::retry_fn(f)
        .retries(attempts.saturating_sub(1))
        .fixed_backoff(delay)
}
