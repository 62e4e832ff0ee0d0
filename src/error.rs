//! Error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::calibration::CaptureState;

/// Invalid inputs detected before any pixel is processed.
///
/// These are always fatal to the call that produced them; the caller is
/// expected to fix the inputs and retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("invalid geometry {width}x{height}: both dimensions must be non-zero")]
    InvalidGeometry { width: u32, height: u32 },
    #[error("expected {expected} captured frames (or {with_reference} with a reference pair), got {actual}")]
    FrameCount {
        expected: usize,
        with_reference: usize,
        actual: usize,
    },
    #[error("frame {index} is {width}x{height}, expected {expected_width}x{expected_height}")]
    FrameSize {
        index: usize,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
    #[error("plane {plane} out of range, pattern set has {total} planes")]
    PlaneOutOfRange { plane: usize, total: usize },
    #[error("buffer holds {actual} bytes, {width}x{height} raster needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("capture session is {state}, not ready to decode")]
    CaptureNotReady { state: CaptureState },
}

/// Errors raised by the file-facing parts of the crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("missing captured frame: {}", .0.display())]
    MissingFrame(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
