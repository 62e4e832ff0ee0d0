//! Gray code pattern decoder.
//!
//! Turns the captured bit-plane frames back into a per-camera-pixel projector
//! column/row. Pixels that cannot be trusted are marked invalid instead of
//! failing the pass.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::gray_code::{from_gray_code, PatternConfig};
use crate::error::ConfigurationError;
use crate::raster::{linear_index, pixel_count, CapturedFrame, Raster};

/// Default global threshold and minimum reference contrast.
pub const DEFAULT_THRESHOLD: u8 = 64;
pub const DEFAULT_MIN_CONTRAST: u8 = 64;

/// Thresholding parameters for a decode pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Global threshold, used when no reference pair is supplied.
    pub threshold: u8,
    /// Pixels whose bright/dark difference does not exceed this are rejected.
    pub min_contrast: u8,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_contrast: DEFAULT_MIN_CONTRAST,
        }
    }
}

/// Phase of the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Nothing decoded yet.
    Idle,
    /// Shifting thresholded bits into the per-pixel codes.
    Accumulating,
    /// Inverting Gray codes and range checking.
    Finalizing,
    /// A correspondence map is available.
    Done,
}

/// Outcome for a single camera pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelStatus {
    Valid,
    /// Bright/dark reference difference too small to trust the bits.
    LowContrast,
    /// Decoded coordinate falls outside the projector.
    OutOfRange,
}

/// Per-status pixel counts of a decode pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStats {
    pub valid: usize,
    pub low_contrast: usize,
    pub out_of_range: usize,
}

/// Result of decoding Gray code patterns.
#[derive(Debug, Clone)]
pub struct DecodedCorrespondences {
    /// Camera image dimensions.
    pub camera_width: u32,
    pub camera_height: u32,
    /// Projector dimensions.
    pub projector_width: u32,
    pub projector_height: u32,
    /// Per-pixel decoded projector column (meaningful where valid).
    pub projector_x: Vec<u32>,
    /// Per-pixel decoded projector row (meaningful where valid).
    pub projector_y: Vec<u32>,
    /// Raw accumulated column Gray codes.
    pub column_code: Vec<u32>,
    /// Raw accumulated row Gray codes.
    pub row_code: Vec<u32>,
    /// Mean distance of each sample from its threshold (0.0-1.0 per pixel).
    pub confidence: Vec<f32>,
    /// Why each pixel was accepted or rejected.
    pub status: Vec<PixelStatus>,
    /// Shadow/occlusion mask (true = valid pixel).
    pub valid_mask: Vec<bool>,
}

impl DecodedCorrespondences {
    /// Get correspondence (column, row) at camera pixel (x, y).
    pub fn get(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        let idx = self.index(x, y)?;
        if self.valid_mask[idx] {
            Some((self.projector_x[idx], self.projector_y[idx]))
        } else {
            None
        }
    }

    pub fn is_valid(&self, x: u32, y: u32) -> bool {
        self.index(x, y).is_some_and(|idx| self.valid_mask[idx])
    }

    pub fn status(&self, x: u32, y: u32) -> Option<PixelStatus> {
        self.index(x, y).map(|idx| self.status[idx])
    }

    /// Count valid correspondences.
    pub fn valid_count(&self) -> usize {
        self.valid_mask.iter().filter(|&&v| v).count()
    }

    pub fn stats(&self) -> DecodeStats {
        let mut stats = DecodeStats::default();
        for status in &self.status {
            match status {
                PixelStatus::Valid => stats.valid += 1,
                PixelStatus::LowContrast => stats.low_contrast += 1,
                PixelStatus::OutOfRange => stats.out_of_range += 1,
            }
        }
        stats
    }

    /// Validity as a displayable {0, 255} raster.
    pub fn mask_image(&self) -> Raster {
        Raster::from_fn(self.camera_width, self.camera_height, |x, y| {
            if self.is_valid(x, y) {
                255
            } else {
                0
            }
        })
    }

    /// False colour view for operators: red = column, green = row.
    ///
    /// Out of range codes are drawn blue, low contrast pixels black.
    pub fn debug_image(&self) -> image::RgbImage {
        let scale_x = 255.0 / self.projector_width.saturating_sub(1).max(1) as f32;
        let scale_y = 255.0 / self.projector_height.saturating_sub(1).max(1) as f32;

        image::RgbImage::from_fn(self.camera_width, self.camera_height, |x, y| {
            let idx = y as usize * self.camera_width as usize + x as usize;
            match self.status[idx] {
                PixelStatus::Valid => image::Rgb([
                    (self.projector_x[idx] as f32 * scale_x).round() as u8,
                    (self.projector_y[idx] as f32 * scale_y).round() as u8,
                    0,
                ]),
                PixelStatus::OutOfRange => image::Rgb([0, 0, 255]),
                PixelStatus::LowContrast => image::Rgb([0, 0, 0]),
            }
        })
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        linear_index(self.camera_width, self.camera_height, x, y)
    }
}

/// Per-pixel accumulator built while walking the planes.
#[derive(Debug, Clone, Copy)]
struct PixelCode {
    column_code: u32,
    row_code: u32,
    margin: u32,
    decodable: bool,
}

impl PixelCode {
    const REJECTED: Self = Self {
        column_code: 0,
        row_code: 0,
        margin: 0,
        decodable: false,
    };
}

/// Bright and dark reference frames.
#[derive(Debug, Clone, Copy)]
struct Reference<'a> {
    bright: &'a [u8],
    dark: &'a [u8],
}

/// Inverts a captured Gray code sequence into camera-to-projector correspondences.
#[derive(Debug, Clone)]
pub struct CorrespondenceDecoder {
    camera_width: u32,
    camera_height: u32,
    config: PatternConfig,
    state: DecoderState,
    result: Option<DecodedCorrespondences>,
}

impl CorrespondenceDecoder {
    pub fn new(
        camera_width: u32,
        camera_height: u32,
        projector_width: u32,
        projector_height: u32,
    ) -> Result<Self, ConfigurationError> {
        if camera_width == 0 || camera_height == 0 {
            return Err(ConfigurationError::InvalidGeometry {
                width: camera_width,
                height: camera_height,
            });
        }

        Ok(Self {
            camera_width,
            camera_height,
            config: PatternConfig::new(projector_width, projector_height)?,
            state: DecoderState::Idle,
            result: None,
        })
    }

    pub fn pattern_config(&self) -> &PatternConfig {
        &self.config
    }

    pub fn camera_dimensions(&self) -> (u32, u32) {
        (self.camera_width, self.camera_height)
    }

    /// Bit-plane frames expected by [`decode`](Self::decode), reference pair excluded.
    pub fn required_image_count(&self) -> usize {
        self.config.total_planes()
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Decode a captured sequence.
    ///
    /// `frames` holds either exactly one frame per plane, decoded against
    /// `options.threshold`, or a leading bright and dark reference followed by
    /// one frame per plane, decoded against the per-pixel reference midpoint.
    pub fn decode(
        &mut self,
        frames: &[CapturedFrame],
        options: &DecodeOptions,
    ) -> Result<&DecodedCorrespondences, ConfigurationError> {
        let expected = self.config.total_planes();
        if frames.len() == expected {
            self.run(frames, None, options)
        } else if frames.len() == expected + 2 {
            self.run(&frames[2..], Some((&frames[0], &frames[1])), options)
        } else {
            Err(self.frame_count_error(frames.len()))
        }
    }

    /// Decode with an explicit bright/dark reference pair.
    pub fn decode_with_reference(
        &mut self,
        planes: &[CapturedFrame],
        bright: &CapturedFrame,
        dark: &CapturedFrame,
        options: &DecodeOptions,
    ) -> Result<&DecodedCorrespondences, ConfigurationError> {
        if planes.len() != self.config.total_planes() {
            return Err(self.frame_count_error(planes.len() + 2));
        }
        self.run(planes, Some((bright, dark)), options)
    }

    /// Decoded map of the last successful pass.
    pub fn correspondences(&self) -> Option<&DecodedCorrespondences> {
        self.result.as_ref()
    }

    /// Decoded (column, row) at a camera pixel, `None` when invalid.
    pub fn row_col(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        self.result.as_ref()?.get(x, y)
    }

    pub fn is_valid_row_col(&self, x: u32, y: u32) -> bool {
        self.result.as_ref().is_some_and(|r| r.is_valid(x, y))
    }

    /// Validity mask; all zero before the first decode.
    pub fn mask_image(&self) -> Raster {
        match &self.result {
            Some(result) => result.mask_image(),
            None => Raster::new(self.camera_width, self.camera_height),
        }
    }

    /// False colour view of the decoded codes; black before the first decode.
    pub fn debug_image(&self) -> image::RgbImage {
        match &self.result {
            Some(result) => result.debug_image(),
            None => image::RgbImage::new(self.camera_width, self.camera_height),
        }
    }

    fn frame_count_error(&self, actual: usize) -> ConfigurationError {
        let expected = self.config.total_planes();
        ConfigurationError::FrameCount {
            expected,
            with_reference: expected + 2,
            actual,
        }
    }

    fn check_size(&self, index: usize, frame: &CapturedFrame) -> Result<(), ConfigurationError> {
        let (width, height) = frame.dimensions();
        if width != self.camera_width || height != self.camera_height {
            return Err(ConfigurationError::FrameSize {
                index,
                width,
                height,
                expected_width: self.camera_width,
                expected_height: self.camera_height,
            });
        }
        Ok(())
    }

    fn run(
        &mut self,
        planes: &[CapturedFrame],
        reference: Option<(&CapturedFrame, &CapturedFrame)>,
        options: &DecodeOptions,
    ) -> Result<&DecodedCorrespondences, ConfigurationError> {
        let plane_offset = match reference {
            Some((bright, dark)) => {
                self.check_size(0, bright)?;
                self.check_size(1, dark)?;
                2
            }
            None => 0,
        };
        for (i, frame) in planes.iter().enumerate() {
            self.check_size(plane_offset + i, frame)?;
        }

        let plane_data: Vec<&[u8]> = planes.iter().map(|f| f.as_slice()).collect();
        let reference = reference.map(|(bright, dark)| Reference {
            bright: bright.as_slice(),
            dark: dark.as_slice(),
        });

        log::debug!(
            "Decoding {} planes ({} column, {} row) at {}x{}, reference pair: {}",
            plane_data.len(),
            self.config.column_planes(),
            self.config.row_planes(),
            self.camera_width,
            self.camera_height,
            reference.is_some()
        );

        self.state = DecoderState::Accumulating;
        let codes = self.accumulate(&plane_data, reference, options);

        self.state = DecoderState::Finalizing;
        let result = self.finalize(&codes, plane_data.len());

        let stats = result.stats();
        log::info!(
            "Decoded {} valid correspondences ({} low contrast, {} out of range)",
            stats.valid,
            stats.low_contrast,
            stats.out_of_range
        );

        self.state = DecoderState::Done;
        Ok(&*self.result.insert(result))
    }

    fn accumulate(
        &self,
        planes: &[&[u8]],
        reference: Option<Reference<'_>>,
        options: &DecodeOptions,
    ) -> Vec<PixelCode> {
        let column_planes = self.config.column_planes() as usize;
        let pixel_total = pixel_count(self.camera_width, self.camera_height);
        let decode = |i: usize| accumulate_pixel(i, planes, column_planes, reference, options);

        #[cfg(feature = "parallel")]
        {
            (0..pixel_total).into_par_iter().map(decode).collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            (0..pixel_total).map(decode).collect()
        }
    }

    fn finalize(&self, codes: &[PixelCode], plane_count: usize) -> DecodedCorrespondences {
        let pixel_total = codes.len();
        let projector_width = self.config.projector_width();
        let projector_height = self.config.projector_height();
        let margin_scale = if plane_count == 0 {
            0.0
        } else {
            1.0 / (plane_count as f32 * 255.0)
        };

        let mut result = DecodedCorrespondences {
            camera_width: self.camera_width,
            camera_height: self.camera_height,
            projector_width,
            projector_height,
            projector_x: vec![0; pixel_total],
            projector_y: vec![0; pixel_total],
            column_code: vec![0; pixel_total],
            row_code: vec![0; pixel_total],
            confidence: vec![0.0; pixel_total],
            status: vec![PixelStatus::LowContrast; pixel_total],
            valid_mask: vec![false; pixel_total],
        };

        for (i, code) in codes.iter().enumerate() {
            if !code.decodable {
                continue;
            }

            let column = from_gray_code(code.column_code);
            let row = from_gray_code(code.row_code);

            result.column_code[i] = code.column_code;
            result.row_code[i] = code.row_code;
            result.projector_x[i] = column;
            result.projector_y[i] = row;
            result.confidence[i] = if plane_count == 0 {
                1.0
            } else {
                code.margin as f32 * margin_scale
            };

            if column < projector_width && row < projector_height {
                result.status[i] = PixelStatus::Valid;
                result.valid_mask[i] = true;
            } else {
                result.status[i] = PixelStatus::OutOfRange;
            }
        }

        result
    }
}

fn accumulate_pixel(
    i: usize,
    planes: &[&[u8]],
    column_planes: usize,
    reference: Option<Reference<'_>>,
    options: &DecodeOptions,
) -> PixelCode {
    let threshold = match reference {
        Some(reference) => {
            let bright = reference.bright[i];
            let dark = reference.dark[i];
            if bright.abs_diff(dark) <= options.min_contrast {
                return PixelCode::REJECTED;
            }
            ((bright as u16 + dark as u16) / 2) as u8
        }
        None => options.threshold,
    };

    let mut code = PixelCode {
        decodable: true,
        ..PixelCode::REJECTED
    };

    for (k, plane) in planes.iter().enumerate() {
        let value = plane[i];
        let bit = u32::from(value >= threshold);
        code.margin += u32::from(value.abs_diff(threshold));

        if k < column_planes {
            code.column_code = (code.column_code << 1) | bit;
        } else {
            code.row_code = (code.row_code << 1) | bit;
        }
    }

    code
}
