use async_trait::async_trait;

use super::PlaceSource;
use crate::{entities::Place, error::Error, external::google_maps::GoogleMaps};

/// Falls back to the commercial places text search. Results already carry
/// coordinates.
pub struct PlacesTextSearch {
    maps: GoogleMaps,
}

impl PlacesTextSearch {
    pub fn new(maps: GoogleMaps) -> Self {
        Self { maps }
    }
}

#[async_trait]
impl PlaceSource for PlacesTextSearch {
    fn name(&self) -> &'static str {
        "places_text_search"
    }

    #[tracing::instrument(skip(self))]
    async fn run(&self, location: &str) -> Result<Vec<Place>, Error> {
        let query = format!("public parks beaches lakes in {}", location);
        let results = self.maps.text_search(&query).await?;

        Ok(results
            .into_iter()
            .filter_map(|result| match result.coordinates() {
                Some(point) => Some(Place::new(result.name, location).with_coordinates(point)),
                None => {
                    tracing::debug!(place = %result.name, "dropping result without coordinates");
                    None
                }
            })
            .collect())
    }
}

#[test]
fn results_keep_provider_order_and_coordinates() {
    use crate::external::google_maps::testing::{places_json, API_BASE, API_KEY};
    use crate::external::http::testing::FakeFetch;
    use std::sync::Arc;
    use tokio_test::block_on;

    let probe = GoogleMaps::new(Arc::new(FakeFetch::new()), API_BASE.into(), API_KEY.into());
    let url = probe
        .text_search_url("public parks beaches lakes in Madison")
        .unwrap();
    let fetch = FakeFetch::new().body(
        url.as_str(),
        places_json(&[("Tenney Park", 43.09, -89.37), ("James Madison Park", 43.08, -89.38)]),
    );
    let source = PlacesTextSearch::new(GoogleMaps::new(Arc::new(fetch), API_BASE.into(), API_KEY.into()));

    let places = block_on(source.run("Madison")).unwrap();

    assert_eq!(places.len(), 2);
    assert_eq!(places[0].name, "Tenney Park");
    assert_eq!(places[1].name, "James Madison Park");
    assert_eq!(places[1].coordinates.map(|c| c.lat), Some(43.08));
}

#[test]
fn results_without_coordinates_are_dropped() {
    use crate::external::google_maps::testing::{API_BASE, API_KEY};
    use crate::external::http::testing::FakeFetch;
    use serde_json::json;
    use std::sync::Arc;
    use tokio_test::block_on;

    let body = json!({
        "status": "OK",
        "results": [
            { "name": "Good Park", "geometry": { "location": { "lat": 48.85, "lng": 2.35 } } },
            { "name": "Bad" },
            { "name": "Half Geometry", "geometry": {} }
        ]
    });

    let probe = GoogleMaps::new(Arc::new(FakeFetch::new()), API_BASE.into(), API_KEY.into());
    let url = probe.text_search_url("public parks beaches lakes in Paris").unwrap();
    let fetch = FakeFetch::new().body(url.as_str(), body.to_string());
    let source = PlacesTextSearch::new(GoogleMaps::new(Arc::new(fetch), API_BASE.into(), API_KEY.into()));

    let places = block_on(source.run("Paris")).unwrap();

    assert_eq!(places.len(), 1);
    assert_eq!(places[0].name, "Good Park");
}
