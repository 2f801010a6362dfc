use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Serializes outbound calls: one task runs at a time, and consecutive task
/// starts are at least `min_interval` apart.
///
/// Waiters queue on a fair mutex, so tasks start in arrival order. Clones
/// share the same slot.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_start: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn schedule<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        // the slot stays held until the task completes
        let mut last_start = self.last_start.lock().await;

        if let Some(prev) = *last_start {
            let ready_at = prev + self.min_interval;
            if Instant::now() < ready_at {
                tracing::trace!(wait = ?(ready_at - Instant::now()), "rate limiter delaying task");
                sleep_until(ready_at).await;
            }
        }

        *last_start = Some(Instant::now());

        task().await
    }
}

#[test]
fn five_tasks_span_at_least_four_intervals() {
    use tokio_test::block_on;

    let interval = Duration::from_millis(40);
    let limiter = RateLimiter::new(interval);

    block_on(async {
        let started = Instant::now();

        for _ in 0..5 {
            limiter.schedule(|| async {}).await;
        }

        assert!(started.elapsed() >= interval * 4);
    });
}

#[test]
fn tasks_run_one_at_a_time_in_arrival_order() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::block_on;

    let limiter = RateLimiter::new(Duration::from_millis(5));
    let running = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    block_on(async {
        let mut handles = Vec::new();

        for i in 0..4 {
            let limiter = limiter.clone();
            let running = running.clone();
            let order = order.clone();

            handles.push(tokio::spawn(async move {
                limiter
                    .schedule(|| async move {
                        assert_eq!(running.fetch_add(1, Ordering::SeqCst), 0);
                        order.lock().unwrap().push(i);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }));

            // let each spawned task reach the queue before the next one
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        for handle in handles {
            handle.await.unwrap();
        }
    });

    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
}
