use super::Engine;

use async_trait::async_trait;

use crate::{
    api::{PlacesAPI, API},
    entities::Place,
    error::{invalid_input_error, Error},
};

#[async_trait]
impl PlacesAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn resolve_places(&self, location: &str) -> Result<Vec<Place>, Error> {
        let location = location.trim();

        if location.is_empty() {
            tracing::warn!("rejected empty location");
            return Err(invalid_input_error("Location is required"));
        }

        let result = self
            .cache
            .get_or_resolve(location, || self.run_pipeline(location))
            .await;

        if let Err(err) = &result {
            tracing::error!(location, %err, "place resolution failed");
        }

        result
    }
}

impl API for Engine {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        api::PlacesAPI,
        engine::{Engine, LocationCache, MissingCoordinates},
        external::{
            google_maps::{testing as maps, GoogleMaps},
            http::testing::{Canned, FakeFetch},
        },
        sources::{default_chain, testing as wiki},
    };

    const SF_SW: (f64, f64) = (37.70, -122.52);
    const SF_NE: (f64, f64) = (37.83, -122.35);

    fn maps_probe() -> GoogleMaps {
        GoogleMaps::new(Arc::new(FakeFetch::new()), maps::API_BASE.into(), maps::API_KEY.into())
    }

    fn geocode_url(address: &str) -> String {
        maps_probe().geocode_url(address).unwrap().to_string()
    }

    fn text_search_url(location: &str) -> String {
        maps_probe()
            .text_search_url(&format!("public parks beaches lakes in {}", location))
            .unwrap()
            .to_string()
    }

    fn category_url(location: &str) -> String {
        format!("{}/wiki/Category:Parks_in_{}", wiki::WIKI_BASE, location.replace(' ', "_"))
    }

    fn engine(fetch: Arc<FakeFetch>, missing: MissingCoordinates) -> Engine {
        let maps = GoogleMaps::new(fetch.clone(), maps::API_BASE.into(), maps::API_KEY.into());

        Engine::new(
            Arc::new(maps.clone()),
            default_chain(wiki::scraper(fetch), maps),
            Arc::new(LocationCache::new(100, None)),
            missing,
            10,
        )
    }

    #[test]
    fn empty_location_makes_no_calls() {
        use tokio_test::block_on;

        let fetch = Arc::new(FakeFetch::new());
        let engine = engine(fetch.clone(), MissingCoordinates::Exclude);

        let err = block_on(engine.resolve_places("")).unwrap_err();
        assert_eq!(err.message, "Location is required");

        let err = block_on(engine.resolve_places("   ")).unwrap_err();
        assert_eq!(err.message, "Location is required");

        assert_eq!(fetch.calls(), 0);
    }

    #[test]
    fn unknown_area_is_reported() {
        use tokio_test::block_on;

        let fetch = Arc::new(
            FakeFetch::new().body(geocode_url("Zzzzznotaplace"), maps::zero_results_json()),
        );
        let engine = engine(fetch.clone(), MissingCoordinates::Exclude);

        let err = block_on(engine.resolve_places("Zzzzznotaplace")).unwrap_err();

        assert!(err.message.starts_with("Geocoding API returned no results"));
        // no source is consulted without bounds
        assert_eq!(fetch.calls(), 1);
    }

    #[test]
    fn area_without_geometry_is_a_bad_request() {
        use crate::error::geocode_area_error;
        use axum::http::StatusCode;
        use axum::response::IntoResponse;
        use serde_json::json;
        use tokio_test::block_on;

        let body = json!({ "status": "OK", "results": [{ "formatted_address": "x" }] });
        let fetch = Arc::new(FakeFetch::new().body(geocode_url("Somewhere"), body.to_string()));
        let engine = engine(fetch, MissingCoordinates::Exclude);

        let err = block_on(engine.resolve_places("Somewhere")).unwrap_err();

        assert_eq!(err, geocode_area_error("Somewhere"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn repeated_names_are_geocoded_once() {
        use tokio_test::block_on;

        let place_url = geocode_url("Parc Monceau, Paris");
        let fetch = Arc::new(
            FakeFetch::new()
                .body(geocode_url("Paris"), maps::bounds_json((48.81, 2.22), (48.90, 2.47)))
                .body(
                    category_url("Paris"),
                    wiki::category_page(&["Parc Monceau", "Parc Monceau", "Parc Monceau"]),
                )
                .body(place_url.clone(), maps::point_json(48.879, 2.309)),
        );
        let engine = engine(fetch.clone(), MissingCoordinates::Exclude);

        let places = block_on(engine.resolve_places("Paris")).unwrap();
        let lookups = fetch
            .requested()
            .iter()
            .filter(|url| **url == place_url)
            .count();

        assert_eq!(places.len(), 1);
        assert_eq!(lookups, 1);
    }

    #[test]
    fn first_source_candidates_inside_bounds() {
        use tokio_test::block_on;

        let fetch = FakeFetch::new()
            .body(geocode_url("San Francisco"), maps::bounds_json(SF_SW, SF_NE))
            .body(
                category_url("San Francisco"),
                wiki::category_page(&["Golden Gate Park", "Dolores Park", "Ocean Beach"]),
            )
            .body(
                geocode_url("Golden Gate Park, San Francisco"),
                maps::point_json(37.769, -122.486),
            )
            .body(
                geocode_url("Dolores Park, San Francisco"),
                maps::point_json(37.759, -122.427),
            )
            .body(
                geocode_url("Ocean Beach, San Francisco"),
                maps::point_json(37.760, -122.510),
            );
        let engine = engine(Arc::new(fetch), MissingCoordinates::Exclude);

        let places = block_on(engine.resolve_places("San Francisco")).unwrap();
        let names: Vec<_> = places.iter().map(|place| place.name.as_str()).collect();

        assert_eq!(names, vec!["Golden Gate Park", "Dolores Park", "Ocean Beach"]);
        assert!(places.iter().all(|place| place.coordinates.is_some()));
    }

    #[test]
    fn out_of_bounds_and_unlocated_candidates() {
        use tokio_test::block_on;

        let build = || {
            FakeFetch::new()
                .body(geocode_url("San Francisco"), maps::bounds_json(SF_SW, SF_NE))
                .body(
                    category_url("San Francisco"),
                    wiki::category_page(&["Golden Gate Park", "Lake Tahoe", "Hidden Cove"]),
                )
                .body(
                    geocode_url("Golden Gate Park, San Francisco"),
                    maps::point_json(37.769, -122.486),
                )
                .body(
                    geocode_url("Lake Tahoe, San Francisco"),
                    maps::point_json(39.09, -120.03),
                )
                .body(
                    geocode_url("Hidden Cove, San Francisco"),
                    maps::zero_results_json(),
                )
        };

        let excluding = engine(Arc::new(build()), MissingCoordinates::Exclude);
        let places = block_on(excluding.resolve_places("San Francisco")).unwrap();
        let names: Vec<_> = places.iter().map(|place| place.name.as_str()).collect();
        assert_eq!(names, vec!["Golden Gate Park"]);

        let including = engine(Arc::new(build()), MissingCoordinates::Include);
        let places = block_on(including.resolve_places("San Francisco")).unwrap();
        let names: Vec<_> = places.iter().map(|place| place.name.as_str()).collect();
        assert_eq!(names, vec!["Golden Gate Park", "Hidden Cove"]);
    }

    #[test]
    fn places_api_fallback_is_truncated_to_ten() {
        use tokio_test::block_on;

        let location = "Madison";
        let results: Vec<(String, f64, f64)> = (0..12)
            .map(|i| (format!("Madison Park {}", i), 43.05 + i as f64 * 0.001, -89.40))
            .collect();
        let results: Vec<(&str, f64, f64)> = results
            .iter()
            .map(|(name, lat, lng)| (name.as_str(), *lat, *lng))
            .collect();

        // every encyclopedia page is missing, so sources 1-4 fail or come up empty
        let fetch = Arc::new(
            FakeFetch::new()
                .body(geocode_url(location), maps::bounds_json((43.0, -89.6), (43.2, -89.2)))
                .body(text_search_url(location), maps::places_json(&results)),
        );
        let engine = engine(fetch.clone(), MissingCoordinates::Exclude);

        let places = block_on(engine.resolve_places(location)).unwrap();
        let names: Vec<_> = places.iter().map(|place| place.name.clone()).collect();
        let expected: Vec<_> = (0..10).map(|i| format!("Madison Park {}", i)).collect();

        assert_eq!(names, expected);
        // no per-candidate geocoding for places that already have coordinates
        assert!(!fetch
            .requested()
            .iter()
            .any(|url| url.contains("Madison+Park")));
    }

    #[test]
    fn no_candidates_is_an_empty_success() {
        use serde_json::json;
        use tokio_test::block_on;

        let empty_places = json!({ "status": "ZERO_RESULTS", "results": [] }).to_string();
        let fetch = FakeFetch::new()
            .body(geocode_url("Atlantis"), maps::bounds_json((0.0, 0.0), (1.0, 1.0)))
            .body(text_search_url("Atlantis"), empty_places);
        let engine = engine(Arc::new(fetch), MissingCoordinates::Exclude);

        let places = block_on(engine.resolve_places("Atlantis")).unwrap();
        assert!(places.is_empty());
    }

    #[test]
    fn warm_cache_makes_no_calls() {
        use tokio_test::block_on;

        let fetch = Arc::new(
            FakeFetch::new()
                .body(geocode_url("Paris"), maps::bounds_json((48.81, 2.22), (48.90, 2.47)))
                .body(category_url("Paris"), wiki::category_page(&["Parc Monceau"]))
                .body(geocode_url("Parc Monceau, Paris"), maps::point_json(48.879, 2.309)),
        );
        let engine = engine(fetch.clone(), MissingCoordinates::Exclude);

        let first = block_on(engine.resolve_places("Paris")).unwrap();
        let calls = fetch.calls();
        let second = block_on(engine.resolve_places("Paris")).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(fetch.calls(), calls);
    }

    #[test]
    fn exhausted_rate_limit_aborts_the_run() {
        use tokio_test::block_on;

        let fetch = Arc::new(
            FakeFetch::new()
                .body(geocode_url("Paris"), maps::bounds_json((48.81, 2.22), (48.90, 2.47)))
                .respond(category_url("Paris"), Canned::TooManyRequests),
        );
        let engine = engine(fetch.clone(), MissingCoordinates::Exclude);

        let err = block_on(engine.resolve_places("Paris")).unwrap_err();

        assert!(err.is_rate_limited());
        // later sources are not consulted
        assert_eq!(fetch.calls(), 2);
    }

    #[test]
    fn results_are_unique_and_bounded() {
        use std::collections::HashSet;
        use tokio_test::block_on;

        let names = [
            "Alamo Square", "Alamo Square", "Buena Vista Park", "Corona Heights", "Duboce Park",
            "Esprit Park", "Fort Funston", "Glen Canyon Park", "Holly Park", "Islais Creek",
            "Jefferson Square", "Kite Hill", "Lafayette Park",
        ];
        let mut fetch = FakeFetch::new()
            .body(geocode_url("San Francisco"), maps::bounds_json(SF_SW, SF_NE))
            .body(category_url("San Francisco"), wiki::category_page(&names));
        for name in names {
            fetch = fetch.body(
                geocode_url(&format!("{}, San Francisco", name)),
                maps::point_json(37.76, -122.44),
            );
        }
        let engine = engine(Arc::new(fetch), MissingCoordinates::Exclude);

        let places = block_on(engine.resolve_places("San Francisco")).unwrap();
        let unique: HashSet<_> = places.iter().map(|place| place.name.as_str()).collect();

        assert_eq!(places.len(), 10);
        assert_eq!(unique.len(), 10);
        assert_eq!(places[1].name, "Buena Vista Park");
    }
}
