mod bounds;
mod cache;
mod places_api;

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use crate::{
    config::Config,
    entities::{Bounds, Place},
    error::Error,
    external::{
        google_maps::{Geocoder, GoogleMaps},
        http::{Fetch, HttpClient},
        rate_limiter::RateLimiter,
        retry::Backoff,
        wikipedia::Wikipedia,
    },
    extract::NameFilter,
    sources::{default_chain, PlaceSource, Scraper},
};

pub use bounds::{filter_to_bounds, MissingCoordinates};
pub use cache::LocationCache;

/// Runs the place-resolution pipeline: area geocoding, the source chain,
/// candidate geocoding, bounds filtering, dedup and truncation, with results
/// cached per location.
pub struct Engine {
    geocoder: Arc<dyn Geocoder>,
    sources: Vec<Box<dyn PlaceSource>>,
    cache: Arc<LocationCache>,
    missing_coordinates: MissingCoordinates,
    max_results: usize,
}

impl Engine {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        sources: Vec<Box<dyn PlaceSource>>,
        cache: Arc<LocationCache>,
        missing_coordinates: MissingCoordinates,
        max_results: usize,
    ) -> Self {
        Self {
            geocoder,
            sources,
            cache,
            missing_coordinates,
            max_results,
        }
    }

    #[tracing::instrument(name = "Engine::from_config", skip_all)]
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let limiter = RateLimiter::new(config.rate_limit_interval);
        let backoff = Backoff::new(
            config.retry_base_delay,
            config.retry_max_attempts,
            config.retry_jitter,
        );
        let fetch: Arc<dyn Fetch> =
            Arc::new(HttpClient::new(&config.user_agent, limiter, backoff)?);

        let maps = GoogleMaps::new(
            fetch.clone(),
            config.google_maps_api_base.clone(),
            config.google_maps_api_key.clone(),
        );
        let scraper = Scraper {
            fetch,
            wiki: Wikipedia::new(config.wikipedia_base.clone()),
            names: Arc::new(NameFilter::with_extra_terms(&config.extra_deny_terms)?),
        };

        tracing::info!(
            missing_coordinates = %config.missing_coordinates,
            max_results = config.max_results,
            "engine configured"
        );

        Ok(Self::new(
            Arc::new(maps.clone()),
            default_chain(scraper, maps),
            Arc::new(LocationCache::new(config.cache_capacity, config.cache_ttl)),
            config.missing_coordinates,
            config.max_results,
        ))
    }

    #[tracing::instrument(skip(self))]
    async fn run_pipeline(&self, location: &str) -> Result<Vec<Place>, Error> {
        let bounds: Bounds = self.geocoder.geocode_area(location).await?;

        let candidates = self.find_candidates(location).await?;
        if candidates.is_empty() {
            tracing::info!(location, "no source produced candidates");
            return Ok(Vec::new());
        }

        // each distinct name is looked up once
        let candidates = dedup_by_name(candidates);
        let candidates = self.geocode_candidates(candidates, location).await;

        let mut places = filter_to_bounds(candidates, &bounds, self.missing_coordinates);
        places.truncate(self.max_results);
        tracing::info!(location, count = places.len(), "resolved places");

        Ok(places)
    }

    /// First non-empty source wins. A failing source counts as empty, except
    /// when rate-limit retries are exhausted, which aborts the run.
    async fn find_candidates(&self, location: &str) -> Result<Vec<Place>, Error> {
        for source in &self.sources {
            match source.run(location).await {
                Ok(candidates) if !candidates.is_empty() => {
                    tracing::info!(
                        location,
                        source = source.name(),
                        count = candidates.len(),
                        "source produced candidates"
                    );
                    return Ok(candidates);
                }
                Ok(_) => {
                    tracing::debug!(location, source = source.name(), "source produced nothing");
                }
                Err(err) if err.is_rate_limited() => {
                    tracing::error!(location, source = source.name(), %err, "source rate limited");
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(location, source = source.name(), %err, "source failed");
                }
            }
        }

        Ok(Vec::new())
    }

    /// Fills in coordinates for candidates that lack them. Lookups are issued
    /// together and all complete before this returns; a failed lookup leaves
    /// the place without coordinates.
    async fn geocode_candidates(&self, places: Vec<Place>, location: &str) -> Vec<Place> {
        let lookups = places.into_iter().map(|place| async move {
            if place.coordinates.is_some() {
                return place;
            }

            match self.geocoder.geocode_place(&place.name, location).await {
                Ok(Some(point)) => place.with_coordinates(point),
                Ok(None) => place,
                Err(err) => {
                    tracing::warn!(location, place = %place.name, %err, "place geocoding failed");
                    place
                }
            }
        });

        join_all(lookups).await
    }
}

/// Keeps the first occurrence of each name, in discovery order.
pub fn dedup_by_name(places: Vec<Place>) -> Vec<Place> {
    let mut seen = HashSet::new();

    places
        .into_iter()
        .filter(|place| seen.insert(place.name.clone()))
        .collect()
}

#[test]
fn dedup_keeps_first_occurrence_in_order() {
    use crate::entities::Coordinates;

    let first = Place::new("Ocean Beach".into(), "SF").with_coordinates(Coordinates { lat: 1.0, lng: 1.0 });
    let places = vec![
        first.clone(),
        Place::new("Dolores Park".into(), "SF"),
        Place::new("Ocean Beach".into(), "SF"),
        Place::new("ocean beach".into(), "SF"),
    ];

    let places = dedup_by_name(places);
    let names: Vec<_> = places.iter().map(|place| place.name.as_str()).collect();

    assert_eq!(names, vec!["Ocean Beach", "Dolores Park", "ocean beach"]);
    assert_eq!(places[0], first);
}

#[test]
fn dedup_collapses_repeated_names() {
    let places: Vec<_> = (0..15)
        .flat_map(|i| {
            let name = format!("Park {}", i);
            vec![Place::new(name.clone(), "X"), Place::new(name, "X")]
        })
        .collect();

    let places = dedup_by_name(places);

    assert_eq!(places.len(), 15);
    assert_eq!(places[9].name, "Park 9");
}
