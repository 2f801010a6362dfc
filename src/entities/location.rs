use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Bounding box of a geocoded area, as reported by the geocoding provider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub southwest: Coordinates,
    pub northeast: Coordinates,
}

impl Bounds {
    /// Inclusive on all four edges.
    pub fn contains(&self, point: &Coordinates) -> bool {
        self.southwest.lat <= point.lat
            && point.lat <= self.northeast.lat
            && self.southwest.lng <= point.lng
            && point.lng <= self.northeast.lng
    }
}

#[test]
fn bounds_contains_is_inclusive() {
    let bounds = Bounds {
        southwest: Coordinates {
            lat: 37.70,
            lng: -122.52,
        },
        northeast: Coordinates {
            lat: 37.83,
            lng: -122.35,
        },
    };

    assert!(bounds.contains(&Coordinates {
        lat: 37.77,
        lng: -122.45
    }));
    assert!(bounds.contains(&bounds.southwest));
    assert!(bounds.contains(&bounds.northeast));
    assert!(bounds.contains(&Coordinates {
        lat: 37.70,
        lng: -122.35
    }));

    assert!(!bounds.contains(&Coordinates {
        lat: 37.69,
        lng: -122.45
    }));
    assert!(!bounds.contains(&Coordinates {
        lat: 37.77,
        lng: -122.34
    }));
}
