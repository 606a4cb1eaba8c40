use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoundaryError {
    #[error("invalid file type '{0}': expected a .kml or .kmz file")]
    InvalidFileType(String),

    #[error("failed to parse KML document: {0}")]
    MalformedDocument(String),

    #[error("ZIP operation failed: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("KMZ archive does not contain a .kml document")]
    MissingKmlEntry,

    #[error("no coordinates found in the document")]
    NoCoordinatesFound,

    #[error("unknown placemark id '{0}'")]
    UnknownPlacemarkId(String),
}
