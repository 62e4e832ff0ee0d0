//! Gray Code Structured Light Engine
//!
//! Generates the bit-plane patterns a projector has to show and decodes the
//! camera captures of those patterns into a per-camera-pixel projector
//! column/row map with a validity mask:
//! - Gray code pattern generation sized to the projector
//! - Thresholded multi-frame decoding with optional bright/dark references
//! - Capture sequencing with exposure averaging
//! - PNG export/import of patterns, captures and decode results

pub mod calibration;
pub mod config;
pub mod error;
pub mod export;
pub mod raster;

pub use calibration::{
    CorrespondenceDecoder, DecodeOptions, DecodedCorrespondences, GrayCodeGenerator, PixelStatus,
};
pub use error::{ConfigurationError, Error};
pub use raster::{CapturedFrame, Pattern, Raster};
