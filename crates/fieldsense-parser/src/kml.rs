use std::io::{Cursor, Read};

use geojson::{Feature, Geometry, Value};
use roxmltree::{Document, Node};

use crate::errors::BoundaryError;
use crate::model::{BoundarySeries, Coordinate, Placemark};

/// Parse result for one uploaded boundary file.
///
/// Holds every placemark that carried coordinate text, or a single
/// fallback geometry derived from the document as a whole when no
/// placemark did. Construction fails rather than producing a document
/// with neither.
#[derive(Debug, Clone)]
pub struct BoundaryDocument {
    placemarks: Vec<Placemark>,
    fallback: Option<Vec<Coordinate>>,
}

impl BoundaryDocument {
    /// Parse a boundary file from its declared name and raw bytes.
    ///
    /// `.kml` bytes are parsed directly; `.kmz` bytes are unpacked first
    /// and the archive's main KML document is parsed. Any other extension
    /// is rejected before a parse is attempted.
    pub fn from_file(filename: &str, bytes: &[u8]) -> Result<Self, BoundaryError> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".kml") {
            let text = std::str::from_utf8(bytes).map_err(|_| {
                BoundaryError::MalformedDocument("file is not valid UTF-8".to_string())
            })?;
            Self::from_kml_text(text)
        } else if lower.ends_with(".kmz") {
            let text = extract_kml_from_kmz(bytes)?;
            Self::from_kml_text(&text)
        } else {
            Err(BoundaryError::InvalidFileType(filename.to_string()))
        }
    }

    /// Parse KML text that has already been pulled out of its container.
    pub fn from_kml_text(text: &str) -> Result<Self, BoundaryError> {
        let doc = Document::parse(text)
            .map_err(|err| BoundaryError::MalformedDocument(err.to_string()))?;

        let placemarks = extract_placemarks(&doc);
        if !placemarks.is_empty() {
            return Ok(Self {
                placemarks,
                fallback: None,
            });
        }

        let feature = fallback_feature(&doc).ok_or(BoundaryError::NoCoordinatesFound)?;
        let coordinates = feature_coordinates(&feature);
        if coordinates.is_empty() {
            return Err(BoundaryError::NoCoordinatesFound);
        }

        Ok(Self {
            placemarks: Vec::new(),
            fallback: Some(coordinates),
        })
    }

    pub fn placemarks(&self) -> &[Placemark] {
        &self.placemarks
    }

    /// True when the caller must pick a placemark id before a series can
    /// be produced.
    pub fn requires_selection(&self) -> bool {
        self.placemarks.len() > 1
    }

    /// The series for an unambiguous document: the sole placemark, or the
    /// fallback geometry. `None` when several placemarks compete.
    pub fn default_series(&self) -> Option<BoundarySeries> {
        match self.placemarks.as_slice() {
            [only] => Some(BoundarySeries::from_coordinates(&only.coordinates)),
            [] => self
                .fallback
                .as_deref()
                .map(BoundarySeries::from_coordinates),
            _ => None,
        }
    }

    /// The series for the placemark with the given id.
    pub fn select(&self, id: &str) -> Result<BoundarySeries, BoundaryError> {
        self.placemarks
            .iter()
            .find(|p| p.id == id)
            .map(|p| BoundarySeries::from_coordinates(&p.coordinates))
            .ok_or_else(|| BoundaryError::UnknownPlacemarkId(id.to_string()))
    }
}

fn is_element(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

fn extract_placemarks(doc: &Document<'_>) -> Vec<Placemark> {
    let mut placemarks = Vec::new();

    for (index, node) in doc
        .descendants()
        .filter(|n| is_element(n, "Placemark"))
        .enumerate()
    {
        let id = node
            .attribute("id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("placemark-{index}"));

        let name = node
            .descendants()
            .find(|n| is_element(n, "name"))
            .and_then(|n| n.text())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Placemark {}", index + 1));

        let Some(text) = node
            .descendants()
            .find(|n| is_element(n, "coordinates"))
            .and_then(|n| n.text())
        else {
            continue;
        };

        let coordinates = parse_coordinate_text(text);
        if coordinates.is_empty() {
            continue;
        }

        placemarks.push(Placemark {
            id,
            name,
            coordinates,
        });
    }

    placemarks
}

/// Split coordinate text into points: whitespace separates points, commas
/// separate the (longitude, latitude, altitude?) components of one point.
/// Tokens that do not parse as decimals are dropped.
fn parse_coordinate_text(text: &str) -> Vec<Coordinate> {
    text.split_whitespace()
        .filter_map(|token| {
            let mut parts = token.split(',');
            let longitude = parts.next()?.trim().parse::<f64>().ok()?;
            let latitude = parts.next()?.trim().parse::<f64>().ok()?;
            let altitude = parts.next().and_then(|p| p.trim().parse::<f64>().ok());
            Some(Coordinate {
                longitude,
                latitude,
                altitude,
            })
        })
        .collect()
}

/// Collapse every loose coordinate list in the document into one GeoJSON
/// LineString feature, mirroring the generic KML-to-GeoJSON conversion the
/// importer falls back to when no placemark carries coordinates.
fn fallback_feature(doc: &Document<'_>) -> Option<Feature> {
    let positions: Vec<Vec<f64>> = doc
        .descendants()
        .filter(|n| is_element(n, "coordinates"))
        .filter_map(|n| n.text())
        .flat_map(parse_coordinate_text)
        .map(|c| match c.altitude {
            Some(altitude) => vec![c.longitude, c.latitude, altitude],
            None => vec![c.longitude, c.latitude],
        })
        .collect();

    if positions.is_empty() {
        return None;
    }

    Some(Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(positions))),
        id: None,
        properties: None,
        foreign_members: None,
    })
}

fn feature_coordinates(feature: &Feature) -> Vec<Coordinate> {
    let Some(geometry) = &feature.geometry else {
        return Vec::new();
    };
    let Value::LineString(positions) = &geometry.value else {
        return Vec::new();
    };
    positions
        .iter()
        .filter_map(|position| match position.as_slice() {
            [longitude, latitude] => Some(Coordinate {
                longitude: *longitude,
                latitude: *latitude,
                altitude: None,
            }),
            [longitude, latitude, altitude, ..] => Some(Coordinate {
                longitude: *longitude,
                latitude: *latitude,
                altitude: Some(*altitude),
            }),
            _ => None,
        })
        .collect()
}

/// Pull the main KML document out of a KMZ archive. The conventional entry
/// is `doc.kml` at the archive root; any other `.kml` entry is accepted
/// when that one is absent.
fn extract_kml_from_kmz(bytes: &[u8]) -> Result<String, BoundaryError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let entry_name = {
        let mut names: Vec<String> = archive
            .file_names()
            .filter(|name| name.to_ascii_lowercase().ends_with(".kml"))
            .map(str::to_string)
            .collect();
        names.sort();
        names
            .iter()
            .find(|name| name.as_str() == "doc.kml")
            .cloned()
            .or_else(|| names.into_iter().next())
            .ok_or(BoundaryError::MissingKmlEntry)?
    };

    let mut entry = archive.by_name(&entry_name)?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}
