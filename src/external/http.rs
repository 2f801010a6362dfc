use async_trait::async_trait;
use reqwest::{header, StatusCode};

use crate::error::{rate_limited_error, upstream_error, Error};

use super::rate_limiter::RateLimiter;
use super::retry::{retry_rate_limited, Backoff};

/// Fetches the body of a GET request. Every source and the geocoder go
/// through this seam.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, Error>;
}

/// `Fetch` over reqwest, gated by the shared rate limiter and retrying only
/// on HTTP 429.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    limiter: RateLimiter,
    backoff: Backoff,
}

impl HttpClient {
    pub fn new(user_agent: &str, limiter: RateLimiter, backoff: Backoff) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            limiter,
            backoff,
        })
    }

    async fn get_once(&self, url: &str) -> Result<String, Error> {
        let res = self
            .client
            .get(url)
            .header(header::ACCEPT, "text/html,application/json")
            .send()
            .await?;

        let status = res.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(rate_limited_error());
        } else if !status.is_success() {
            return Err(upstream_error(status));
        }

        Ok(res.text().await?)
    }
}

#[async_trait]
impl Fetch for HttpClient {
    #[tracing::instrument(skip(self))]
    async fn get(&self, url: &str) -> Result<String, Error> {
        retry_rate_limited(&self.backoff, || {
            self.limiter.schedule(|| self.get_once(url))
        })
        .await
    }
}

#[cfg(test)]
pub mod testing {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::Fetch;
    use crate::error::{rate_limited_error, upstream_error, Error};

    #[derive(Clone)]
    pub enum Canned {
        Body(String),
        TooManyRequests,
        Status(u16),
    }

    /// In-memory `Fetch` keyed by exact URL. Unknown URLs answer 404.
    #[derive(Default)]
    pub struct FakeFetch {
        responses: Mutex<HashMap<String, VecDeque<Canned>>>,
        calls: AtomicUsize,
        requested: Mutex<Vec<String>>,
    }

    impl FakeFetch {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a response; the last queued response for a URL is sticky.
        pub fn respond(self, url: impl Into<String>, canned: Canned) -> Self {
            self.responses
                .lock()
                .unwrap()
                .entry(url.into())
                .or_default()
                .push_back(canned);
            self
        }

        pub fn body(self, url: impl Into<String>, body: impl Into<String>) -> Self {
            self.respond(url, Canned::Body(body.into()))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetch for FakeFetch {
        async fn get(&self, url: &str) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(url.to_string());

            let mut responses = self.responses.lock().unwrap();
            let queue = match responses.get_mut(url) {
                Some(queue) => queue,
                None => return Err(upstream_error("404 Not Found")),
            };

            let canned = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };

            match canned {
                Some(Canned::Body(body)) => Ok(body),
                Some(Canned::TooManyRequests) => Err(rate_limited_error()),
                Some(Canned::Status(status)) => Err(upstream_error(status)),
                None => Err(upstream_error("404 Not Found")),
            }
        }
    }
}

#[test]
fn fake_fetch_replays_scripted_responses() {
    use testing::{Canned, FakeFetch};
    use tokio_test::block_on;

    let fetch = FakeFetch::new()
        .respond("https://example.test/a", Canned::TooManyRequests)
        .body("https://example.test/a", "ok");

    block_on(async {
        assert!(fetch.get("https://example.test/a").await.unwrap_err().is_rate_limited());
        assert_eq!(fetch.get("https://example.test/a").await.unwrap(), "ok");
        assert_eq!(fetch.get("https://example.test/a").await.unwrap(), "ok");
        assert!(fetch.get("https://example.test/missing").await.is_err());
    });

    assert_eq!(fetch.calls(), 4);
}

#[test]
fn retry_wraps_rate_limited_fetches() {
    use std::time::Duration;
    use testing::{Canned, FakeFetch};
    use tokio::time::Instant;
    use tokio_test::block_on;

    let fetch = FakeFetch::new()
        .respond("https://example.test/a", Canned::TooManyRequests)
        .respond("https://example.test/a", Canned::TooManyRequests)
        .body("https://example.test/a", "attempt 3");
    let limiter = RateLimiter::new(Duration::from_millis(1));
    let backoff = Backoff::new(Duration::from_millis(20), 5, Duration::ZERO);

    let started = Instant::now();
    let body = block_on(retry_rate_limited(&backoff, || {
        limiter.schedule(|| fetch.get("https://example.test/a"))
    }))
    .unwrap();

    assert_eq!(body, "attempt 3");
    assert_eq!(fetch.calls(), 3);
    assert!(started.elapsed() >= Duration::from_millis(60));
}
