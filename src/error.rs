//! Error type shared by every module of the crate.

use thiserror::Error;

/// Errors surfaced to the caller.
///
/// Degenerate geometry and missing color samples are absorbed internally and
/// never show up here.
#[derive(Debug, Error)]
pub enum BlendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML write error: {0}")]
    XmlWrite(#[from] quick_xml::SeError),

    #[error("XML deserialize error: {0}")]
    XmlParse(#[from] quick_xml::DeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Missing calibration field '{0}'")]
    MissingField(String),

    #[error("Field '{field}' has shape {found_rows}x{found_cols}, expected {rows}x{cols}")]
    MatrixShape {
        field: String,
        rows: usize,
        cols: usize,
        found_rows: usize,
        found_cols: usize,
    },

    #[error("Field '{field}' is malformed: {reason}")]
    MalformedField { field: String, reason: String },

    #[error("Invalid footprint: {0}")]
    InvalidFootprint(String),

    #[error("Alpha mask is {found_width}x{found_height}, expected {width}x{height}")]
    MaskDimensions {
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("Alpha mask payload is {found} bytes, expected {expected}")]
    MaskPayload { expected: usize, found: usize },

    #[error("Overlap count {count} exceeds the configured maximum of {max}")]
    OverlapLimitExceeded { count: u32, max: usize },

    #[error("Projector {index} out of range ({count} configured)")]
    ProjectorIndex { index: usize, count: usize },

    #[error("Projector {index} is {found}, expected {expected}")]
    InvalidState {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Lookup table cache mismatch: {0}")]
    CacheMismatch(String),

    #[error("Lookup table cache decode error: {0}")]
    CacheDecode(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BlendError>;
