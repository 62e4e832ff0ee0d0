//! Image export and import for pattern sequences and decode results.
//!
//! Files follow one naming scheme in both directions: `white.png`,
//! `black.png` and `plane_NN.png`.

use std::path::{Path, PathBuf};

use crate::calibration::{CapturePattern, DecodedCorrespondences, GrayCodeGenerator};
use crate::error::{Error, Result};
use crate::raster::{CapturedFrame, Raster};

/// File name used for an image of the display sequence.
pub fn file_name(pattern: CapturePattern) -> String {
    match pattern {
        CapturePattern::White => "white.png".to_string(),
        CapturePattern::Black => "black.png".to_string(),
        CapturePattern::Plane(plane) => format!("plane_{:02}.png", plane),
    }
}

/// Writes patterns and decode results to disk.
pub struct SequenceExporter;

impl SequenceExporter {
    /// Write a raster as 8-bit grayscale PNG.
    pub fn export_raster(raster: &Raster, path: &Path) -> Result<()> {
        raster.to_gray_image().save(path)?;
        Ok(())
    }

    /// Write the full display sequence into `output_dir`.
    pub fn export_patterns(
        generator: &GrayCodeGenerator,
        output_dir: &Path,
        with_reference: bool,
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(output_dir)?;

        let mut written = Vec::new();
        for pattern in generator.config().capture_sequence(with_reference) {
            let path = output_dir.join(file_name(pattern));
            Self::export_raster(&generator.render(pattern)?, &path)?;
            written.push(path);
        }

        log::info!(
            "Exported {} patterns to {}",
            written.len(),
            output_dir.display()
        );
        Ok(written)
    }

    /// Write `mask.png` and `debug.png` for a decode result.
    pub fn export_decode(result: &DecodedCorrespondences, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)?;

        Self::export_raster(&result.mask_image(), &output_dir.join("mask.png"))?;
        result.debug_image().save(output_dir.join("debug.png"))?;

        log::info!("Exported mask and debug image to {}", output_dir.display());
        Ok(())
    }
}

/// Load one captured frame as grayscale.
pub fn load_frame(path: &Path) -> Result<CapturedFrame> {
    if !path.exists() {
        return Err(Error::MissingFrame(path.to_path_buf()));
    }
    let image = image::open(path)?.to_luma8();
    Ok(Raster::from_gray_image(image))
}

/// Load a captured sequence in decode order.
///
/// The reference pair is included when both `white.png` and `black.png` are
/// present; every plane file must exist.
pub fn load_capture(input_dir: &Path, total_planes: usize) -> Result<Vec<CapturedFrame>> {
    let white = input_dir.join(file_name(CapturePattern::White));
    let black = input_dir.join(file_name(CapturePattern::Black));
    let with_reference = white.exists() && black.exists();

    let mut frames = Vec::with_capacity(total_planes + 2);
    if with_reference {
        frames.push(load_frame(&white)?);
        frames.push(load_frame(&black)?);
    }
    for plane in 0..total_planes {
        frames.push(load_frame(
            &input_dir.join(file_name(CapturePattern::Plane(plane))),
        )?);
    }

    log::info!(
        "Loaded {} frames from {} (reference pair: {})",
        frames.len(),
        input_dir.display(),
        with_reference
    );
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{CorrespondenceDecoder, DecodeOptions};

    #[test]
    fn test_file_names() {
        assert_eq!(file_name(CapturePattern::White), "white.png");
        assert_eq!(file_name(CapturePattern::Plane(3)), "plane_03.png");
        assert_eq!(file_name(CapturePattern::Plane(12)), "plane_12.png");
    }

    #[test]
    fn test_export_then_decode_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let generator = GrayCodeGenerator::new(12, 7).unwrap();

        let written = SequenceExporter::export_patterns(&generator, dir.path(), true).unwrap();
        assert_eq!(written.len(), generator.required_image_count() + 2);

        let frames = load_capture(dir.path(), generator.required_image_count()).unwrap();
        assert_eq!(frames[2], generator.generate(0).unwrap());

        let mut decoder = CorrespondenceDecoder::new(12, 7, 12, 7).unwrap();
        let result = decoder.decode(&frames, &DecodeOptions::default()).unwrap();
        assert_eq!(result.valid_count(), 12 * 7);

        SequenceExporter::export_decode(result, dir.path()).unwrap();
        let mask = load_frame(&dir.path().join("mask.png")).unwrap();
        assert!(mask.as_slice().iter().all(|&v| v == 255));
        assert!(dir.path().join("debug.png").exists());
    }

    #[test]
    fn test_missing_plane_reported() {
        let dir = tempfile::tempdir().unwrap();
        let generator = GrayCodeGenerator::new(4, 4).unwrap();
        SequenceExporter::export_patterns(&generator, dir.path(), false).unwrap();
        std::fs::remove_file(dir.path().join("plane_02.png")).unwrap();

        let err = load_capture(dir.path(), 4).unwrap_err();
        assert!(matches!(err, Error::MissingFrame(path) if path.ends_with("plane_02.png")));
    }

    #[test]
    fn test_capture_without_reference() {
        let dir = tempfile::tempdir().unwrap();
        let generator = GrayCodeGenerator::new(4, 2).unwrap();
        SequenceExporter::export_patterns(&generator, dir.path(), false).unwrap();

        let frames = load_capture(dir.path(), 3).unwrap();
        assert_eq!(frames.len(), 3);
    }
}
