use axum::extract::{Extension, Json, Query};
use serde::{Deserialize, Serialize};

use crate::api::PlacesAPI;
use crate::entities::Place;
use crate::error::Error;
use crate::server::DynAPI;

#[derive(Serialize, Deserialize)]
pub struct SearchParams {
    location: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct SearchResults {
    results: Vec<Place>,
}

pub async fn search(
    Extension(api): Extension<DynAPI>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, Error> {
    let location = params.location.unwrap_or_default();
    let results = api.resolve_places(&location).await?;

    Ok(SearchResults { results }.into())
}

#[cfg(test)]
struct StubAPI;

#[cfg(test)]
#[async_trait::async_trait]
impl PlacesAPI for StubAPI {
    async fn resolve_places(&self, location: &str) -> Result<Vec<Place>, Error> {
        if location.trim().is_empty() {
            return Err(crate::error::invalid_input_error("Location is required"));
        }

        Ok(vec![Place::new("Lake Merritt".into(), location)])
    }
}

#[cfg(test)]
impl crate::api::API for StubAPI {}

#[test]
fn search_wraps_results() {
    use std::sync::Arc;
    use tokio_test::block_on;

    let api = Arc::new(StubAPI) as DynAPI;
    let params = SearchParams {
        location: Some("Oakland".into()),
    };

    let Json(body) = block_on(search(Extension(api), Query(params))).unwrap();
    let value = serde_json::to_value(&body).unwrap();

    assert_eq!(value["results"][0]["name"], "Lake Merritt");
    assert!(value["results"][0]["mapLink"]
        .as_str()
        .unwrap()
        .contains("Lake+Merritt+Oakland"));
}

#[test]
fn missing_location_is_a_bad_request() {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::sync::Arc;
    use tokio_test::block_on;

    let api = Arc::new(StubAPI) as DynAPI;
    let params = SearchParams { location: None };

    let err = match block_on(search(Extension(api), Query(params))) {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };

    assert_eq!(err.message, "Location is required");
    assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
}
