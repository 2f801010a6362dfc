pub mod html;
pub mod names;

pub use html::{extract, Link};
pub use names::NameFilter;
