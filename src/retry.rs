use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Exponential-backoff parameters for the transaction retry executor
/// (spec.md §4.K, §8 invariant 9). Mirrors the shape of the neo4j
/// drivers' own retry policy: an initial delay doubled (by default) on
/// every attempt, capped by a total retry budget, with multiplicative
/// jitter so a thundering herd of clients doesn't retry in lockstep.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retry_time: Duration,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retry_time: Duration::from_secs(30),
            initial_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    fn jittered_delay(&self, base: Duration) -> Duration {
        let jitter = rand::rng().random_range(-self.jitter_factor..=self.jitter_factor);
        let scaled = base.as_secs_f64() * (1.0 + jitter);
        Duration::from_secs_f64(scaled.max(0.0))
    }
}

/// Run `work` until it succeeds, a non-retryable error is returned, or
/// the total elapsed retry time exceeds `config.max_retry_time` — spec.md
/// §4.K's transaction function retry loop. `work` is expected to open,
/// run, and commit (or roll back) its own transaction on each attempt;
/// this executor only owns the backoff/retry decision, not transaction
/// lifecycle (spec.md §1 Non-goals keep query-building sugar out of
/// scope, but the retry loop itself is an explicit §4.K operation).
pub async fn execute_with_retry<F, Fut, T>(config: &RetryConfig, mut work: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let start = Instant::now();
    let mut delay = config.initial_delay;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match work().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                if start.elapsed() >= config.max_retry_time {
                    warn!(attempt, "retry budget exhausted, surfacing last error");
                    return Err(err);
                }
                let wait = config.jittered_delay(delay);
                debug!(attempt, ?wait, error = %err, "retrying transaction after transient failure");
                tokio::time::sleep(wait).await;
                delay = delay.mul_f64(config.multiplier);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let config = RetryConfig { max_retry_time: Duration::from_secs(60), ..RetryConfig::default() };
        let attempts_clone = attempts.clone();
        let result = execute_with_retry(&config, move || {
            let attempts = attempts_clone.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Error::Routing(bolt_routing::RoutingError::ServiceUnavailable))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_surfaces_immediately() {
        let config = RetryConfig::default();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let result: Result<(), Error> = execute_with_retry(&config, move || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::Configuration("bad statement".to_owned()))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_bounds_total_wait() {
        let config = RetryConfig {
            max_retry_time: Duration::from_millis(50),
            initial_delay: Duration::from_millis(10),
            multiplier: 2.0,
            jitter_factor: 0.0,
        };
        let start = Instant::now();
        let result: Result<(), Error> = execute_with_retry(&config, || async {
            Err(Error::Routing(bolt_routing::RoutingError::ServiceUnavailable))
        })
        .await;
        assert!(result.is_err());
        assert!(start.elapsed() >= config.max_retry_time);
    }
}
