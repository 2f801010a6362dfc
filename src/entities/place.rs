use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;

const MAP_SEARCH_URL: &str = "https://www.google.com/maps/search/";

/// A candidate outdoor place discovered by one of the sources.
///
/// `map_link` is a map search for the name within the queried location, not a
/// verified deep link.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub name: String,
    pub map_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl Place {
    pub fn new(name: String, location: &str) -> Self {
        let map_link = map_link(&name, location);

        Self {
            name,
            map_link,
            coordinates: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }
}

fn map_link(name: &str, location: &str) -> String {
    let query = format!("{} {}", name, location);

    match Url::parse_with_params(MAP_SEARCH_URL, &[("api", "1"), ("query", query.as_str())]) {
        Ok(url) => url.into(),
        Err(_) => MAP_SEARCH_URL.into(),
    }
}

#[test]
fn map_link_is_deterministic() {
    let a = Place::new("Dolores Park".into(), "San Francisco");
    let b = Place::new("Dolores Park".into(), "San Francisco");

    assert_eq!(a.map_link, b.map_link);
    assert_eq!(
        a.map_link,
        "https://www.google.com/maps/search/?api=1&query=Dolores+Park+San+Francisco"
    );
}

#[test]
fn serializes_with_camel_case_and_optional_coordinates() {
    let place = Place::new("Ocean Beach".into(), "San Francisco");
    let value = serde_json::to_value(&place).unwrap();

    assert!(value.get("mapLink").is_some());
    assert!(value.get("coordinates").is_none());

    let place = place.with_coordinates(Coordinates {
        lat: 37.76,
        lng: -122.51,
    });
    let value = serde_json::to_value(&place).unwrap();

    assert_eq!(value["coordinates"]["lat"], 37.76);
    assert_eq!(value["coordinates"]["lng"], -122.51);
}
