mod handler;

pub use handler::{geocode, location_quality, reverse_geocode};
