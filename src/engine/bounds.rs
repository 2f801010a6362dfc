use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::{Bounds, Place};

/// What the bounds filter does with candidates that could not be geocoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingCoordinates {
    Include,
    Exclude,
}

impl FromStr for MissingCoordinates {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "include" => Ok(Self::Include),
            "exclude" => Ok(Self::Exclude),
            other => Err(format!("expected include or exclude, got {:?}", other)),
        }
    }
}

impl fmt::Display for MissingCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Include => f.write_str("include"),
            Self::Exclude => f.write_str("exclude"),
        }
    }
}

/// Keeps candidates inside `bounds`, preserving order.
pub fn filter_to_bounds(
    places: Vec<Place>,
    bounds: &Bounds,
    missing: MissingCoordinates,
) -> Vec<Place> {
    places
        .into_iter()
        .filter(|place| match &place.coordinates {
            Some(point) => bounds.contains(point),
            None => missing == MissingCoordinates::Include,
        })
        .collect()
}

#[cfg(test)]
fn sample() -> (Bounds, Vec<Place>) {
    use crate::entities::Coordinates;

    let bounds = Bounds {
        southwest: Coordinates { lat: 0.0, lng: 0.0 },
        northeast: Coordinates { lat: 1.0, lng: 1.0 },
    };

    let places = vec![
        Place::new("Inside".into(), "Here").with_coordinates(Coordinates { lat: 0.5, lng: 0.5 }),
        Place::new("Unknown".into(), "Here"),
        Place::new("Outside".into(), "Here").with_coordinates(Coordinates { lat: 1.5, lng: 0.5 }),
        Place::new("Edge".into(), "Here").with_coordinates(Coordinates { lat: 1.0, lng: 0.0 }),
    ];

    (bounds, places)
}

#[test]
fn exclude_drops_places_without_coordinates() {
    let (bounds, places) = sample();

    let names: Vec<_> = filter_to_bounds(places, &bounds, MissingCoordinates::Exclude)
        .into_iter()
        .map(|place| place.name)
        .collect();

    assert_eq!(names, vec!["Inside", "Edge"]);
}

#[test]
fn include_keeps_places_without_coordinates() {
    let (bounds, places) = sample();

    let names: Vec<_> = filter_to_bounds(places, &bounds, MissingCoordinates::Include)
        .into_iter()
        .map(|place| place.name)
        .collect();

    assert_eq!(names, vec!["Inside", "Unknown", "Edge"]);
}

#[test]
fn policy_parses_from_config_text() {
    assert_eq!("Exclude".parse(), Ok(MissingCoordinates::Exclude));
    assert_eq!("include".parse(), Ok(MissingCoordinates::Include));
    assert!("sometimes".parse::<MissingCoordinates>().is_err());
}
