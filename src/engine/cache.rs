use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{entities::Place, error::Error};

struct Entry {
    places: Vec<Place>,
    inserted_at: Instant,
}

#[derive(Default)]
struct Entries {
    map: HashMap<String, Entry>,
    order: VecDeque<String>,
}

/// Per-location result cache, bounded by entry count and optionally by age.
///
/// `get_or_resolve` is single-flight: concurrent callers for the same key
/// wait for the first caller's run and then read its result from the cache.
pub struct LocationCache {
    capacity: usize,
    ttl: Option<Duration>,
    entries: Mutex<Entries>,
    inflight: SyncMutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// A caller's claim on the per-key gate. Dropping it, including when the
/// caller's future is cancelled, releases the map entry once no other
/// caller holds the gate.
struct Inflight<'a> {
    cache: &'a LocationCache,
    key: &'a str,
    gate: Arc<Mutex<()>>,
}

impl<'a> Inflight<'a> {
    fn enter(cache: &'a LocationCache, key: &'a str) -> Self {
        let gate = cache
            .inflight()
            .entry(key.to_string())
            .or_default()
            .clone();

        Self { cache, key, gate }
    }
}

impl Drop for Inflight<'_> {
    fn drop(&mut self) {
        let mut inflight = self.cache.inflight();

        // release our reference while the map is locked so the count below
        // only sees callers that are still waiting
        drop(std::mem::replace(&mut self.gate, Arc::new(Mutex::new(()))));

        if inflight
            .get(self.key)
            .map_or(false, |gate| Arc::strong_count(gate) == 1)
        {
            inflight.remove(self.key);
        }
    }
}

impl LocationCache {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            capacity,
            ttl,
            entries: Mutex::new(Entries::default()),
            inflight: SyncMutex::new(HashMap::new()),
        }
    }

    fn inflight(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn get(&self, key: &str) -> Option<Vec<Place>> {
        let mut entries = self.entries.lock().await;

        let expired = match entries.map.get(key) {
            Some(entry) => self
                .ttl
                .map_or(false, |ttl| entry.inserted_at.elapsed() >= ttl),
            None => return None,
        };

        if expired {
            entries.map.remove(key);
            entries.order.retain(|k| k != key);
            return None;
        }

        entries.map.get(key).map(|entry| entry.places.clone())
    }

    pub async fn insert(&self, key: &str, places: Vec<Place>) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.entries.lock().await;

        if entries.map.contains_key(key) {
            entries.order.retain(|k| k != key);
        }

        while entries.map.len() >= self.capacity && !entries.map.contains_key(key) {
            match entries.order.pop_front() {
                Some(oldest) => {
                    tracing::debug!(location = %oldest, "evicting cached results");
                    entries.map.remove(&oldest);
                }
                None => break,
            }
        }

        entries.order.push_back(key.to_string());
        entries.map.insert(
            key.to_string(),
            Entry {
                places,
                inserted_at: Instant::now(),
            },
        );
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.map.len()
    }

    /// Returns the cached list for `key`, or runs `resolve` and caches its
    /// successful result. Errors are returned but never cached.
    pub async fn get_or_resolve<F, Fut>(&self, key: &str, resolve: F) -> Result<Vec<Place>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Place>, Error>>,
    {
        if let Some(places) = self.get(key).await {
            tracing::debug!(location = key, "cache hit");
            return Ok(places);
        }

        let inflight = Inflight::enter(self, key);
        let _turn = inflight.gate.lock().await;

        let result = match self.get(key).await {
            Some(places) => {
                tracing::debug!(location = key, "resolved by a concurrent request");
                Ok(places)
            }
            None => {
                let result = resolve().await;
                if let Ok(places) = &result {
                    self.insert(key, places.clone()).await;
                }
                result
            }
        };

        result
    }
}

#[cfg(test)]
fn place(name: &str) -> Place {
    Place::new(name.into(), "Test")
}

#[test]
fn evicts_oldest_entry_at_capacity() {
    use tokio_test::block_on;

    let cache = LocationCache::new(2, None);

    block_on(async {
        cache.insert("a", vec![place("A Park")]).await;
        cache.insert("b", vec![place("B Park")]).await;
        cache.insert("c", vec![place("C Park")]).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_some());
        assert!(cache.get("c").await.is_some());
    });
}

#[test]
fn reinserting_refreshes_position() {
    use tokio_test::block_on;

    let cache = LocationCache::new(2, None);

    block_on(async {
        cache.insert("a", vec![place("A Park")]).await;
        cache.insert("b", vec![place("B Park")]).await;
        cache.insert("a", vec![place("A Beach")]).await;
        cache.insert("c", vec![place("C Park")]).await;

        assert!(cache.get("b").await.is_none());
        assert_eq!(cache.get("a").await.unwrap()[0].name, "A Beach");
    });
}

#[test]
fn entries_expire_after_ttl() {
    use tokio_test::block_on;

    let cache = LocationCache::new(10, Some(Duration::from_millis(20)));

    block_on(async {
        cache.insert("a", vec![place("A Park")]).await;
        assert!(cache.get("a").await.is_some());

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cache.get("a").await.is_none());
        assert_eq!(cache.len().await, 0);
    });
}

#[test]
fn keys_are_verbatim() {
    use tokio_test::block_on;

    let cache = LocationCache::new(10, None);

    block_on(async {
        cache.insert("Paris", vec![place("Parc Monceau")]).await;

        assert!(cache.get("Paris").await.is_some());
        assert!(cache.get("paris").await.is_none());
    });
}

#[test]
fn concurrent_requests_share_one_run() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::block_on;

    let cache = Arc::new(LocationCache::new(10, None));
    let runs = Arc::new(AtomicUsize::new(0));

    let results = block_on(async {
        let mut handles = Vec::new();

        for _ in 0..3 {
            let cache = cache.clone();
            let runs = runs.clone();

            handles.push(tokio::spawn(async move {
                cache
                    .get_or_resolve("Paris", || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(vec![place("Parc Monceau")])
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }
        results
    });

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|places| places[0].name == "Parc Monceau"));
    assert!(cache.inflight().is_empty());
}

#[test]
fn cancelled_request_releases_its_gate() {
    use tokio_test::block_on;

    let cache = LocationCache::new(10, None);

    block_on(async {
        let slow = cache.get_or_resolve("Paris", || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![place("Parc Monceau")])
        });
        assert!(tokio::time::timeout(Duration::from_millis(10), slow)
            .await
            .is_err());

        assert!(cache.inflight().is_empty());

        let places = cache
            .get_or_resolve("Paris", || async { Ok(vec![place("Parc Astérix")]) })
            .await
            .unwrap();
        assert_eq!(places[0].name, "Parc Astérix");
    });
}

#[test]
fn errors_are_not_cached() {
    use crate::error::upstream_error;
    use tokio_test::block_on;

    let cache = LocationCache::new(10, None);

    block_on(async {
        let result = cache
            .get_or_resolve("Paris", || async { Err(upstream_error("503 Service Unavailable")) })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.len().await, 0);

        let result = cache
            .get_or_resolve("Paris", || async { Ok(vec![place("Parc Monceau")]) })
            .await;
        assert_eq!(result.unwrap().len(), 1);
        assert_eq!(cache.len().await, 1);
    });
}
