mod location;
mod place;

pub use location::{Bounds, Coordinates};
pub use place::Place;
