use async_trait::async_trait;

use crate::entities::Place;
use crate::error::Error;

#[async_trait]
pub trait PlacesAPI {
    /// Up to the configured maximum of deduplicated outdoor places near
    /// `location`. An empty list is a successful "nothing known" answer,
    /// distinct from an error.
    async fn resolve_places(&self, location: &str) -> Result<Vec<Place>, Error>;
}

pub trait API: PlacesAPI {}
