pub mod errors;
pub mod kml;
pub mod model;

pub use errors::BoundaryError;
pub use kml::BoundaryDocument;
pub use model::{BoundarySeries, Coordinate, Placemark};

#[cfg(test)]
mod tests;
