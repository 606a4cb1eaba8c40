use std::io::Write;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::BoundaryError;
use crate::kml::BoundaryDocument;

const TWO_FIELD_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark id="north-field">
      <name>North Field</name>
      <Polygon><outerBoundaryIs><LinearRing>
        <coordinates>
          67.1094,24.9352,0 67.1101,24.9360,0 67.1088,24.9365,0
        </coordinates>
      </LinearRing></outerBoundaryIs></Polygon>
    </Placemark>
    <Placemark>
      <Polygon><outerBoundaryIs><LinearRing>
        <coordinates>67.2000,24.9400 67.2010,24.9410</coordinates>
      </LinearRing></outerBoundaryIs></Polygon>
    </Placemark>
  </Document>
</kml>"#;

fn single_placemark_kml(coordinates: &str) -> String {
    format!(
        r#"<kml><Document><Placemark><name>Field</name>
            <LineString><coordinates>{coordinates}</coordinates></LineString>
        </Placemark></Document></kml>"#
    )
}

#[test]
fn extracts_placemarks_in_document_order() {
    let doc = BoundaryDocument::from_file("boundary.kml", TWO_FIELD_KML.as_bytes())
        .expect("parse two-field document");

    let placemarks = doc.placemarks();
    assert_eq!(placemarks.len(), 2);

    assert_eq!(placemarks[0].id, "north-field");
    assert_eq!(placemarks[0].name, "North Field");
    assert_eq!(placemarks[0].coordinates.len(), 3);

    // No id attribute and no name element fall back to positional labels.
    assert_eq!(placemarks[1].id, "placemark-1");
    assert_eq!(placemarks[1].name, "Placemark 2");
    assert_eq!(placemarks[1].coordinates.len(), 2);

    assert!(doc.requires_selection());
    assert!(doc.default_series().is_none());
}

#[test]
fn series_swaps_longitude_latitude_to_latitude_longitude() {
    let kml = single_placemark_kml("67.1094,24.9352,0 67.1101,24.9360,0");
    let doc = BoundaryDocument::from_file("field.kml", kml.as_bytes()).expect("parse");

    let series = doc.default_series().expect("single placemark series");
    assert_eq!(series.latitudes, "24.9352,24.936");
    assert_eq!(series.longitudes, "67.1094,67.1101");

    // Re-pairing positionally reconstructs the input points, swapped.
    let lats: Vec<&str> = series.latitudes.split(',').collect();
    let longs: Vec<&str> = series.longitudes.split(',').collect();
    assert_eq!(lats.len(), longs.len());
    assert_eq!((lats[0], longs[0]), ("24.9352", "67.1094"));
}

#[test]
fn point_order_is_preserved_in_joined_strings() {
    let kml = single_placemark_kml("1.0,10.0 2.0,20.0 3.0,30.0 4.0,40.0");
    let doc = BoundaryDocument::from_file("field.kml", kml.as_bytes()).expect("parse");

    let series = doc.default_series().expect("series");
    assert_eq!(series.latitudes, "10,20,30,40");
    assert_eq!(series.longitudes, "1,2,3,4");
}

#[test]
fn select_by_id_returns_that_placemark_series() {
    let doc = BoundaryDocument::from_file("boundary.kml", TWO_FIELD_KML.as_bytes())
        .expect("parse two-field document");

    let series = doc.select("placemark-1").expect("select second placemark");
    assert_eq!(series.latitudes, "24.94,24.941");
    assert_eq!(series.longitudes, "67.2,67.201");
}

#[test]
fn select_unknown_id_is_an_error() {
    let doc = BoundaryDocument::from_file("boundary.kml", TWO_FIELD_KML.as_bytes())
        .expect("parse two-field document");

    let err = doc.select("south-field").unwrap_err();
    assert!(matches!(err, BoundaryError::UnknownPlacemarkId(id) if id == "south-field"));
}

#[test]
fn rejects_filenames_without_kml_or_kmz_extension() {
    let err = BoundaryDocument::from_file("boundary.txt", TWO_FIELD_KML.as_bytes()).unwrap_err();
    assert!(matches!(err, BoundaryError::InvalidFileType(name) if name == "boundary.txt"));
}

#[test]
fn malformed_xml_is_reported_as_a_parse_failure() {
    let err = BoundaryDocument::from_file("broken.kml", b"<kml><Placemark>").unwrap_err();
    assert!(matches!(err, BoundaryError::MalformedDocument(_)));
}

#[test]
fn well_formed_document_without_coordinates_fails() {
    let kml = "<kml><Document><Placemark><name>Empty</name></Placemark></Document></kml>";
    let err = BoundaryDocument::from_file("empty.kml", kml.as_bytes()).unwrap_err();
    assert!(matches!(err, BoundaryError::NoCoordinatesFound));
}

#[test]
fn placemark_without_coordinate_text_is_skipped() {
    let kml = r#"<kml><Document>
        <Placemark><name>No geometry</name></Placemark>
        <Placemark id="real"><name>Real</name>
            <LineString><coordinates>5.0,50.0</coordinates></LineString>
        </Placemark>
    </Document></kml>"#;

    let doc = BoundaryDocument::from_file("mixed.kml", kml.as_bytes()).expect("parse");
    assert_eq!(doc.placemarks().len(), 1);
    assert_eq!(doc.placemarks()[0].id, "real");
}

#[test]
fn falls_back_to_document_geometry_when_no_placemarks_exist() {
    let kml = r#"<kml><Document>
        <LineString><coordinates>7.5,51.1,0 7.6,51.2,0</coordinates></LineString>
    </Document></kml>"#;

    let doc = BoundaryDocument::from_file("track.kml", kml.as_bytes()).expect("parse");
    assert!(doc.placemarks().is_empty());
    assert!(!doc.requires_selection());

    let series = doc.default_series().expect("fallback series");
    assert_eq!(series.latitudes, "51.1,51.2");
    assert_eq!(series.longitudes, "7.5,7.6");
}

#[test]
fn unparseable_coordinate_tokens_are_dropped() {
    let kml = single_placemark_kml("abc,def 67.5,24.5 1.0,notanumber");
    let doc = BoundaryDocument::from_file("field.kml", kml.as_bytes()).expect("parse");

    let series = doc.default_series().expect("series");
    assert_eq!(series.latitudes, "24.5");
    assert_eq!(series.longitudes, "67.5");
}

#[test]
fn extracts_kml_from_kmz_archive() {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("doc.kml", options).expect("start doc.kml");
    zip.write_all(TWO_FIELD_KML.as_bytes()).expect("write kml");
    let bytes = zip.finish().expect("finish archive").into_inner();

    let doc = BoundaryDocument::from_file("boundary.kmz", &bytes).expect("parse kmz");
    assert_eq!(doc.placemarks().len(), 2);
    assert_eq!(doc.placemarks()[0].name, "North Field");
}

#[test]
fn kmz_without_kml_entry_is_an_error() {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("readme.txt", options).expect("start entry");
    zip.write_all(b"not a boundary").expect("write entry");
    let bytes = zip.finish().expect("finish archive").into_inner();

    let err = BoundaryDocument::from_file("boundary.kmz", &bytes).unwrap_err();
    assert!(matches!(err, BoundaryError::MissingKmlEntry));
}
