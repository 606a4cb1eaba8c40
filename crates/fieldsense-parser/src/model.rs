use std::fmt;

use serde::{Deserialize, Serialize};

/// One point of a boundary ring. KML stores components in
/// (longitude, latitude, altitude) order; altitude is optional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: Option<f64>,
}

/// A named geographic feature extracted from a KML document, with its
/// coordinate ring in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placemark {
    pub id: String,
    pub name: String,
    pub coordinates: Vec<Coordinate>,
}

impl fmt::Display for Placemark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} points)",
            self.name,
            self.id,
            self.coordinates.len()
        )
    }
}

/// Comma-joined coordinate series for a selected boundary, latitude first.
///
/// The source stores (longitude, latitude) pairs; the series swaps the
/// order so that `latitudes[i]` / `longitudes[i]` re-pair positionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundarySeries {
    pub latitudes: String,
    pub longitudes: String,
}

impl BoundarySeries {
    pub fn from_coordinates(coordinates: &[Coordinate]) -> Self {
        let latitudes = coordinates
            .iter()
            .map(|c| c.latitude.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let longitudes = coordinates
            .iter()
            .map(|c| c.longitude.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            latitudes,
            longitudes,
        }
    }
}
