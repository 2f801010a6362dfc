use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::time::sleep;

use crate::error::{rate_limited_error, Error};

/// Upper bound on a single backoff delay.
pub const MAX_DELAY: Duration = Duration::from_secs(600);

/// Exponential backoff for rate-limited (HTTP 429) responses.
#[derive(Clone, Debug)]
pub struct Backoff {
    pub base_delay: Duration,
    pub max_attempts: u32,
    pub max_jitter: Duration,
    rng: Arc<Mutex<StdRng>>,
}

impl Backoff {
    pub fn new(base_delay: Duration, max_attempts: u32, max_jitter: Duration) -> Self {
        Self {
            base_delay,
            max_attempts: max_attempts.max(1),
            max_jitter,
            rng: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Delay before retrying after the given (1-based) failed attempt:
    /// `base * 2^(attempt - 1)` plus uniform jitter below `max_jitter`,
    /// capped at `MAX_DELAY`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let base = self
            .base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(MAX_DELAY);

        base.saturating_add(self.jitter()).min(MAX_DELAY)
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }

        let jitter_ms = match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..max_ms),
            Err(_) => 0,
        };

        Duration::from_millis(jitter_ms)
    }
}

/// Runs `attempt_fn` until it returns something other than a rate-limit error
/// or the attempt cap is reached. All other errors are returned immediately.
pub async fn retry_rate_limited<F, Fut, T>(backoff: &Backoff, mut attempt_fn: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match attempt_fn().await {
            Err(err) if err.is_rate_limited() => {
                if attempt >= backoff.max_attempts {
                    tracing::warn!(attempt, "rate limited; giving up");
                    return Err(rate_limited_error());
                }

                let delay = backoff.delay(attempt);
                tracing::warn!(attempt, ?delay, "rate limited; retrying");
                sleep(delay).await;
            }
            result => return result,
        }
    }
}

#[test]
fn delay_doubles_per_attempt() {
    let backoff = Backoff::new(Duration::from_millis(100), 5, Duration::ZERO);

    assert_eq!(backoff.delay(1), Duration::from_millis(100));
    assert_eq!(backoff.delay(2), Duration::from_millis(200));
    assert_eq!(backoff.delay(3), Duration::from_millis(400));
    assert_eq!(backoff.delay(4), Duration::from_millis(800));
}

#[test]
fn huge_settings_are_capped() {
    let backoff = Backoff::new(Duration::from_secs(u64::MAX / 2), 100, Duration::from_millis(5));

    assert_eq!(backoff.delay(1), MAX_DELAY);
    assert_eq!(backoff.delay(100), MAX_DELAY);

    let backoff = Backoff::new(Duration::from_millis(1000), 100, Duration::ZERO);
    assert_eq!(backoff.delay(40), MAX_DELAY);
}

#[test]
fn jitter_stays_below_cap() {
    let backoff = Backoff::new(Duration::from_millis(100), 5, Duration::from_millis(50));

    for attempt in 1..=5 {
        let floor = Duration::from_millis(100) * (1 << (attempt - 1));
        let delay = backoff.delay(attempt);

        assert!(delay >= floor);
        assert!(delay < floor + Duration::from_millis(50));
    }
}

#[test]
fn succeeds_after_two_rate_limited_attempts() {
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;
    use tokio_test::block_on;

    let backoff = Backoff::new(Duration::from_millis(20), 5, Duration::from_millis(5));
    let calls = AtomicU32::new(0);

    let started = Instant::now();
    let result = block_on(retry_rate_limited(&backoff, || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n < 3 {
                Err(rate_limited_error())
            } else {
                Ok(format!("payload {}", n))
            }
        }
    }));

    assert_eq!(result.unwrap(), "payload 3");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // 2^0 + 2^1 base delays
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[test]
fn gives_up_after_max_attempts() {
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::block_on;

    let backoff = Backoff::new(Duration::from_millis(1), 5, Duration::ZERO);
    let calls = AtomicU32::new(0);

    let result: Result<(), Error> = block_on(retry_rate_limited(&backoff, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(rate_limited_error()) }
    }));

    assert!(result.unwrap_err().is_rate_limited());
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[test]
fn other_errors_are_not_retried() {
    use crate::error::upstream_error;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::block_on;

    let backoff = Backoff::new(Duration::from_millis(1), 5, Duration::ZERO);
    let calls = AtomicU32::new(0);

    let result: Result<(), Error> = block_on(retry_rate_limited(&backoff, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err(upstream_error("500 Internal Server Error")) }
    }));

    assert!(!result.unwrap_err().is_rate_limited());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
