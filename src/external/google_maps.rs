use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::{
    entities::{Bounds, Coordinates},
    error::{geocode_area_error, parse_error, upstream_error, Error},
    external::http::Fetch,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub geometry: Option<Geometry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Geometry {
    pub location: Option<Coordinates>,
    pub bounds: Option<Bounds>,
    pub viewport: Option<Bounds>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaceResult {
    pub name: String,
    pub geometry: Option<Geometry>,
}

impl PlaceResult {
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.geometry.as_ref().and_then(|geometry| geometry.location)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Response<T> {
    status: String,
    results: Option<Vec<T>>,
    error_message: Option<String>,
}

impl<T> Response<T> {
    /// `OK` and `ZERO_RESULTS` are both successful lookups.
    fn into_results(self) -> Result<Vec<T>, Error> {
        match self.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(self.results.unwrap_or_default()),
            status => Err(upstream_error(format!(
                "{} {}",
                status,
                self.error_message.unwrap_or_default()
            ))),
        }
    }
}

/// Resolves free-text locations to areas and place names to points.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode_area(&self, location: &str) -> Result<Bounds, Error>;

    /// `Ok(None)` means the place could not be located, which is not an error.
    async fn geocode_place(&self, name: &str, location: &str)
        -> Result<Option<Coordinates>, Error>;
}

#[derive(Clone)]
pub struct GoogleMaps {
    fetch: Arc<dyn Fetch>,
    api_base: String,
    api_key: String,
}

impl GoogleMaps {
    pub fn new(fetch: Arc<dyn Fetch>, api_base: String, api_key: String) -> Self {
        Self {
            fetch,
            api_base,
            api_key,
        }
    }

    pub fn geocode_url(&self, address: &str) -> Result<Url, Error> {
        let url = format!("https://{}/maps/api/geocode/json", self.api_base);

        Url::parse_with_params(&url, &[("address", address), ("key", self.api_key.as_str())])
            .map_err(parse_error)
    }

    pub fn text_search_url(&self, query: &str) -> Result<Url, Error> {
        let url = format!("https://{}/maps/api/place/textsearch/json", self.api_base);

        Url::parse_with_params(&url, &[("query", query), ("key", self.api_key.as_str())])
            .map_err(parse_error)
    }

    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, Error> {
        let url = self.geocode_url(address)?;
        let body = self.fetch.get(url.as_str()).await?;
        let data: Response<GeocodeResult> = serde_json::from_str(&body)?;

        data.into_results()
    }

    #[tracing::instrument(skip(self))]
    pub async fn text_search(&self, query: &str) -> Result<Vec<PlaceResult>, Error> {
        let url = self.text_search_url(query)?;
        let body = self.fetch.get(url.as_str()).await?;
        let data: Response<PlaceResult> = serde_json::from_str(&body)?;

        data.into_results()
    }
}

#[async_trait]
impl Geocoder for GoogleMaps {
    #[tracing::instrument(skip(self))]
    async fn geocode_area(&self, location: &str) -> Result<Bounds, Error> {
        let results = self.geocode(location).await?;

        results
            .into_iter()
            .next()
            .and_then(|result| result.geometry)
            .and_then(|geometry| geometry.bounds.or(geometry.viewport))
            .ok_or_else(|| geocode_area_error(location))
    }

    #[tracing::instrument(skip(self))]
    async fn geocode_place(
        &self,
        name: &str,
        location: &str,
    ) -> Result<Option<Coordinates>, Error> {
        let address = format!("{}, {}", name, location);
        let results = self.geocode(&address).await?;

        Ok(results
            .into_iter()
            .next()
            .and_then(|result| result.geometry)
            .and_then(|geometry| geometry.location))
    }
}

#[cfg(test)]
pub mod testing {
    use serde_json::json;

    pub const API_BASE: &str = "maps.test";
    pub const API_KEY: &str = "test-key";

    pub fn bounds_json(sw: (f64, f64), ne: (f64, f64)) -> String {
        json!({
            "status": "OK",
            "results": [{
                "geometry": {
                    "location": { "lat": (sw.0 + ne.0) / 2.0, "lng": (sw.1 + ne.1) / 2.0 },
                    "bounds": {
                        "southwest": { "lat": sw.0, "lng": sw.1 },
                        "northeast": { "lat": ne.0, "lng": ne.1 }
                    }
                }
            }]
        })
        .to_string()
    }

    pub fn point_json(lat: f64, lng: f64) -> String {
        json!({
            "status": "OK",
            "results": [{ "geometry": { "location": { "lat": lat, "lng": lng } } }]
        })
        .to_string()
    }

    pub fn zero_results_json() -> String {
        json!({ "status": "ZERO_RESULTS", "results": [] }).to_string()
    }

    pub fn places_json(places: &[(&str, f64, f64)]) -> String {
        let results: Vec<_> = places
            .iter()
            .map(|(name, lat, lng)| {
                json!({
                    "name": name,
                    "geometry": { "location": { "lat": lat, "lng": lng } }
                })
            })
            .collect();

        json!({ "status": "OK", "results": results }).to_string()
    }
}

#[cfg(test)]
fn test_client(fetch: Arc<dyn Fetch>) -> GoogleMaps {
    GoogleMaps::new(fetch, testing::API_BASE.into(), testing::API_KEY.into())
}

#[test]
fn geocode_area_reads_bounds() {
    use crate::external::http::testing::FakeFetch;
    use tokio_test::block_on;

    let probe = test_client(Arc::new(FakeFetch::new()));
    let url = probe.geocode_url("San Francisco").unwrap();
    let fetch = FakeFetch::new().body(url.as_str(), testing::bounds_json((37.7, -122.5), (37.8, -122.3)));
    let client = test_client(Arc::new(fetch));

    let bounds = block_on(client.geocode_area("San Francisco")).unwrap();

    assert_eq!(bounds.southwest, Coordinates { lat: 37.7, lng: -122.5 });
    assert_eq!(bounds.northeast, Coordinates { lat: 37.8, lng: -122.3 });
}

#[test]
fn geocode_area_falls_back_to_viewport() {
    use crate::external::http::testing::FakeFetch;
    use serde_json::json;
    use tokio_test::block_on;

    let body = json!({
        "status": "OK",
        "results": [{
            "geometry": {
                "location": { "lat": 1.5, "lng": 1.5 },
                "viewport": {
                    "southwest": { "lat": 1.0, "lng": 1.0 },
                    "northeast": { "lat": 2.0, "lng": 2.0 }
                }
            }
        }]
    });

    let probe = test_client(Arc::new(FakeFetch::new()));
    let url = probe.geocode_url("Smallville").unwrap();
    let client = test_client(Arc::new(FakeFetch::new().body(url.as_str(), body.to_string())));

    let bounds = block_on(client.geocode_area("Smallville")).unwrap();
    assert_eq!(bounds.northeast, Coordinates { lat: 2.0, lng: 2.0 });
}

#[test]
fn geocode_area_without_results_is_an_error() {
    use crate::external::http::testing::FakeFetch;
    use tokio_test::block_on;

    let probe = test_client(Arc::new(FakeFetch::new()));
    let url = probe.geocode_url("Zzzzznotaplace").unwrap();
    let client = test_client(Arc::new(FakeFetch::new().body(url.as_str(), testing::zero_results_json())));

    let err = block_on(client.geocode_area("Zzzzznotaplace")).unwrap_err();
    assert!(err.message.starts_with("Geocoding API returned no results"));
}

#[test]
fn geocode_place_absent_is_not_an_error() {
    use crate::external::http::testing::FakeFetch;
    use tokio_test::block_on;

    let probe = test_client(Arc::new(FakeFetch::new()));
    let found = probe.geocode_url("Dolores Park, San Francisco").unwrap();
    let missing = probe.geocode_url("Nowhere Lake, San Francisco").unwrap();
    let fetch = FakeFetch::new()
        .body(found.as_str(), testing::point_json(37.76, -122.43))
        .body(missing.as_str(), testing::zero_results_json());
    let client = test_client(Arc::new(fetch));

    block_on(async {
        let point = client.geocode_place("Dolores Park", "San Francisco").await.unwrap();
        assert_eq!(point, Some(Coordinates { lat: 37.76, lng: -122.43 }));

        let point = client.geocode_place("Nowhere Lake", "San Francisco").await.unwrap();
        assert_eq!(point, None);
    });
}

#[test]
fn provider_denial_is_upstream_error() {
    use crate::external::http::testing::FakeFetch;
    use serde_json::json;
    use tokio_test::block_on;

    let probe = test_client(Arc::new(FakeFetch::new()));
    let url = probe.text_search_url("public parks beaches lakes in Paris").unwrap();
    let body = json!({ "status": "REQUEST_DENIED", "error_message": "bad key" });
    let client = test_client(Arc::new(FakeFetch::new().body(url.as_str(), body.to_string())));

    let err = block_on(client.text_search("public parks beaches lakes in Paris")).unwrap_err();
    assert!(err.message.contains("REQUEST_DENIED"));
}

#[test]
fn geocode_area_without_geometry_is_an_area_error() {
    use crate::error::geocode_area_error;
    use crate::external::http::testing::FakeFetch;
    use serde_json::json;
    use tokio_test::block_on;

    let body = json!({ "status": "OK", "results": [{ "formatted_address": "x" }] });

    let probe = test_client(Arc::new(FakeFetch::new()));
    let url = probe.geocode_url("Somewhere").unwrap();
    let client = test_client(Arc::new(FakeFetch::new().body(url.as_str(), body.to_string())));

    let err = block_on(client.geocode_area("Somewhere")).unwrap_err();
    assert_eq!(err, geocode_area_error("Somewhere"));
}

#[test]
fn text_search_tolerates_results_without_geometry() {
    use crate::external::http::testing::FakeFetch;
    use serde_json::json;
    use tokio_test::block_on;

    let body = json!({
        "status": "OK",
        "results": [
            { "name": "Good Park", "geometry": { "location": { "lat": 1.0, "lng": 2.0 } } },
            { "name": "Bad" }
        ]
    });

    let probe = test_client(Arc::new(FakeFetch::new()));
    let url = probe.text_search_url("public parks beaches lakes in Paris").unwrap();
    let client = test_client(Arc::new(FakeFetch::new().body(url.as_str(), body.to_string())));

    let results = block_on(client.text_search("public parks beaches lakes in Paris")).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].coordinates(), Some(Coordinates { lat: 1.0, lng: 2.0 }));
    assert_eq!(results[1].coordinates(), None);
}
