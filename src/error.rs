//! Error types for track analysis.

/// Errors raised while building or analyzing a track.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Invalid coordinate: lat={latitude}, lon={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("Insufficient data for {stage}: need at least {required} points, got {actual}")]
    InsufficientData {
        stage: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("Track has no points")]
    EmptyInput,

    #[error("Track point {index} has no timestamp")]
    MissingTimestamp { index: usize },

    #[error("Window size must be odd and non-zero, got {window}")]
    InvalidWindow { window: usize },

    #[error("Type mismatch: expected {expected} point, got {found} point")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[cfg(feature = "gpx")]
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[cfg(feature = "gpx")]
    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[cfg(feature = "gpx")]
    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[cfg(feature = "gpx")]
    #[error("Document ended inside <{element}>")]
    UnexpectedEof { element: String },

    #[cfg(feature = "gpx")]
    #[error("Invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using TrackError.
pub type Result<T> = std::result::Result<T, TrackError>;
