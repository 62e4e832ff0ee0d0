//! Gray code pattern generation for structured light calibration.
//!
//! Column planes come first, then row planes. Within each axis the most
//! significant bit is emitted first so plane 0 carries the coarsest stripes.
//! Both axes are Gray coded.

use crate::error::ConfigurationError;
use crate::raster::Raster;

/// Direction of pattern stripes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternDirection {
    /// Stripes run vertically, encode the projector column.
    Vertical,
    /// Stripes run horizontally, encode the projector row.
    Horizontal,
}

/// A single Gray code bit-plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternSpec {
    /// Global plane index in the capture sequence.
    pub plane: usize,
    /// Which bit of the axis Gray code this plane encodes (0 = MSB).
    pub bit_index: u32,
    /// Pattern direction.
    pub direction: PatternDirection,
}

/// One image of the full display sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePattern {
    /// All-illuminated reference.
    White,
    /// All-dark reference.
    Black,
    /// Gray code bit-plane by global index.
    Plane(usize),
}

/// Plane layout derived from projector geometry.
///
/// Only [`PatternConfig::new`] builds one, so the plane counts always match
/// the projector size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternConfig {
    projector_width: u32,
    projector_height: u32,
    column_planes: u32,
    row_planes: u32,
}

impl PatternConfig {
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigurationError> {
        if width == 0 || height == 0 {
            return Err(ConfigurationError::InvalidGeometry { width, height });
        }

        Ok(Self {
            projector_width: width,
            projector_height: height,
            column_planes: planes_for(width),
            row_planes: planes_for(height),
        })
    }

    /// Projector resolution width.
    pub fn projector_width(&self) -> u32 {
        self.projector_width
    }

    /// Projector resolution height.
    pub fn projector_height(&self) -> u32 {
        self.projector_height
    }

    /// Number of planes encoding the column.
    pub fn column_planes(&self) -> u32 {
        self.column_planes
    }

    /// Number of planes encoding the row.
    pub fn row_planes(&self) -> u32 {
        self.row_planes
    }

    /// Number of bit-planes the camera must capture.
    pub fn total_planes(&self) -> usize {
        (self.column_planes + self.row_planes) as usize
    }

    /// Describe a plane, or `None` past the end of the set.
    pub fn spec(&self, plane: usize) -> Option<PatternSpec> {
        let column_planes = self.column_planes as usize;
        if plane < column_planes {
            Some(PatternSpec {
                plane,
                bit_index: plane as u32,
                direction: PatternDirection::Vertical,
            })
        } else if plane < self.total_planes() {
            Some(PatternSpec {
                plane,
                bit_index: (plane - column_planes) as u32,
                direction: PatternDirection::Horizontal,
            })
        } else {
            None
        }
    }

    /// Generate the sequence of bit-planes to project.
    pub fn pattern_sequence(&self) -> Vec<PatternSpec> {
        (0..self.total_planes()).filter_map(|p| self.spec(p)).collect()
    }

    /// Full display order: optional white/black references, then every plane.
    pub fn capture_sequence(&self, with_reference: bool) -> Vec<CapturePattern> {
        let mut sequence = Vec::with_capacity(self.total_planes() + 2);
        if with_reference {
            sequence.push(CapturePattern::White);
            sequence.push(CapturePattern::Black);
        }
        sequence.extend((0..self.total_planes()).map(CapturePattern::Plane));
        sequence
    }

    fn bits_for(&self, direction: PatternDirection) -> u32 {
        match direction {
            PatternDirection::Vertical => self.column_planes,
            PatternDirection::Horizontal => self.row_planes,
        }
    }
}

/// `ceil(log2(extent))`, zero for a single column/row.
pub fn planes_for(extent: u32) -> u32 {
    if extent <= 1 {
        0
    } else {
        u32::BITS - (extent - 1).leading_zeros()
    }
}

/// Convert binary value to Gray code.
#[inline]
pub fn to_gray_code(binary: u32) -> u32 {
    binary ^ (binary >> 1)
}

/// Convert Gray code back to binary.
#[inline]
pub fn from_gray_code(gray: u32) -> u32 {
    let mut binary = gray;
    let mut shift = 1;
    while shift < u32::BITS {
        binary ^= binary >> shift;
        shift *= 2;
    }
    binary
}

/// Gray code pattern generator.
#[derive(Debug, Clone)]
pub struct GrayCodeGenerator {
    config: PatternConfig,
    cursor: usize,
}

impl GrayCodeGenerator {
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigurationError> {
        Ok(Self::from_config(PatternConfig::new(width, height)?))
    }

    pub(crate) fn from_config(config: PatternConfig) -> Self {
        Self { config, cursor: 0 }
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    /// How many frames the caller has to capture (reference pair excluded).
    pub fn required_image_count(&self) -> usize {
        self.config.total_planes()
    }

    /// Rasterize one bit-plane at projector resolution.
    pub fn generate(&self, plane: usize) -> Result<Raster, ConfigurationError> {
        let spec = self
            .config
            .spec(plane)
            .ok_or(ConfigurationError::PlaneOutOfRange {
                plane,
                total: self.config.total_planes(),
            })?;
        Ok(self.generate_pattern(&spec))
    }

    /// Generate pixel data for a pattern; `spec` must come from `self.config`.
    fn generate_pattern(&self, spec: &PatternSpec) -> Raster {
        let width = self.config.projector_width;
        let height = self.config.projector_height;
        let total_bits = self.config.bits_for(spec.direction);
        let bit_position = total_bits - 1 - spec.bit_index;

        let stripe = |coord: u32| -> u8 {
            if (to_gray_code(coord) >> bit_position) & 1 == 1 {
                255
            } else {
                0
            }
        };

        let mut raster = Raster::new(width, height);
        let row_len = width as usize;
        let data = raster.as_mut_slice();

        match spec.direction {
            PatternDirection::Vertical => {
                let row: Vec<u8> = (0..width).map(stripe).collect();
                for dst in data.chunks_exact_mut(row_len) {
                    dst.copy_from_slice(&row);
                }
            }
            PatternDirection::Horizontal => {
                for (y, dst) in data.chunks_exact_mut(row_len).enumerate() {
                    dst.fill(stripe(y as u32));
                }
            }
        }

        raster
    }

    /// Generate all-white reference pattern.
    pub fn generate_white(&self) -> Raster {
        Raster::filled(self.config.projector_width, self.config.projector_height, 255)
    }

    /// Generate all-black reference pattern.
    pub fn generate_black(&self) -> Raster {
        Raster::new(self.config.projector_width, self.config.projector_height)
    }

    /// Rasterize any image of the display sequence.
    pub fn render(&self, pattern: CapturePattern) -> Result<Raster, ConfigurationError> {
        match pattern {
            CapturePattern::White => Ok(self.generate_white()),
            CapturePattern::Black => Ok(self.generate_black()),
            CapturePattern::Plane(plane) => self.generate(plane),
        }
    }

    /// Plane the cursor points at.
    pub fn current_plane(&self) -> usize {
        self.cursor
    }

    /// Produce the plane under the cursor and advance, `None` once exhausted.
    pub fn next_pattern(&mut self) -> Option<Raster> {
        let spec = self.config.spec(self.cursor)?;
        self.cursor += 1;
        Some(self.generate_pattern(&spec))
    }

    /// Rewind the cursor to plane 0.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_gray_code_conversion() {
        for i in 0..(1u32 << 16) {
            let gray = to_gray_code(i);
            assert_eq!(i, from_gray_code(gray), "Failed for {}", i);
        }
    }

    #[test]
    fn test_adjacent_codes_differ_by_one_bit() {
        for i in 0..1024u32 {
            let diff = to_gray_code(i) ^ to_gray_code(i + 1);
            assert_eq!(diff.count_ones(), 1);
        }
    }

    #[test]
    fn test_pattern_count() {
        let config = PatternConfig::new(1920, 1080).unwrap();
        // 1920 and 1080 both need 11 bits (2048)
        assert_eq!(config.column_planes(), 11);
        assert_eq!(config.row_planes(), 11);
        assert_eq!(config.total_planes(), 22);
    }

    #[test]
    fn test_layout_follows_projector_size() {
        let config = PatternConfig::new(640, 3).unwrap();
        assert_eq!(config.projector_width(), 640);
        assert_eq!(config.projector_height(), 3);
        assert_eq!(config.column_planes(), planes_for(640));
        assert_eq!(config.row_planes(), planes_for(3));

        let generator = GrayCodeGenerator::from_config(config);
        assert_eq!(generator.config(), &config);
        assert_eq!(generator.required_image_count(), 12);
        for plane in 0..generator.required_image_count() {
            assert_eq!(generator.generate(plane).unwrap().dimensions(), (640, 3));
        }
        assert_eq!(
            generator.generate(12).unwrap_err(),
            ConfigurationError::PlaneOutOfRange { plane: 12, total: 12 }
        );
    }

    #[test]
    fn test_plane_counts_at_powers_of_two() {
        assert_eq!(planes_for(1), 0);
        assert_eq!(planes_for(2), 1);
        assert_eq!(planes_for(3), 2);
        assert_eq!(planes_for(8), 3);
        assert_eq!(planes_for(9), 4);
        assert_eq!(planes_for(u32::MAX), 32);
    }

    #[test]
    fn test_zero_geometry_rejected() {
        assert_eq!(
            GrayCodeGenerator::new(0, 10).unwrap_err(),
            ConfigurationError::InvalidGeometry { width: 0, height: 10 }
        );
        assert!(GrayCodeGenerator::new(10, 0).is_err());
    }

    #[test]
    fn test_single_pixel_projector_needs_no_planes() {
        let mut generator = GrayCodeGenerator::new(1, 1).unwrap();
        assert_eq!(generator.required_image_count(), 0);
        assert!(generator.next_pattern().is_none());
        assert!(generator.generate(0).is_err());
    }

    #[test]
    fn test_single_row_projector_only_has_column_planes() {
        let generator = GrayCodeGenerator::new(16, 1).unwrap();
        assert_eq!(generator.required_image_count(), 4);
        let sequence = generator.config().pattern_sequence();
        assert!(sequence
            .iter()
            .all(|s| s.direction == PatternDirection::Vertical));
    }

    #[test]
    fn test_column_plane_values() {
        let generator = GrayCodeGenerator::new(8, 8).unwrap();
        // Column 5 -> gray 111b
        let expected = [255u8, 255, 255];
        for (plane, value) in expected.iter().enumerate() {
            let pattern = generator.generate(plane).unwrap();
            for y in 0..8 {
                assert_eq!(pattern.get(5, y), Some(*value));
            }
        }
    }

    #[test]
    fn test_column_plane_values_for_column_four() {
        let generator = GrayCodeGenerator::new(8, 8).unwrap();
        // Column 4 -> gray 110b
        let expected = [255u8, 255, 0];
        for (plane, value) in expected.iter().enumerate() {
            assert_eq!(generator.generate(plane).unwrap().get(4, 0), Some(*value));
        }
    }

    #[test]
    fn test_row_plane_values() {
        let generator = GrayCodeGenerator::new(8, 8).unwrap();
        // Row 2 -> gray 011b
        let expected = [0u8, 255, 255];
        for (offset, value) in expected.iter().enumerate() {
            let pattern = generator.generate(3 + offset).unwrap();
            for x in 0..8 {
                assert_eq!(pattern.get(x, 2), Some(*value));
            }
        }
    }

    #[test]
    fn test_first_plane_is_coarsest() {
        let generator = GrayCodeGenerator::new(16, 4).unwrap();
        let pattern = generator.generate(0).unwrap();
        let row: Vec<u8> = (0..16).map(|x| pattern.get(x, 0).unwrap()).collect();
        assert_eq!(&row[..8], &[0; 8]);
        assert_eq!(&row[8..], &[255; 8]);
    }

    #[test]
    fn test_pattern_values_are_binary() {
        let generator = GrayCodeGenerator::new(37, 21).unwrap();
        for plane in 0..generator.required_image_count() {
            let pattern = generator.generate(plane).unwrap();
            assert_eq!(pattern.dimensions(), (37, 21));
            assert!(pattern.as_slice().iter().all(|&v| v == 0 || v == 255));
        }
    }

    #[test]
    fn test_pattern_determinism() {
        let generator = GrayCodeGenerator::new(100, 60).unwrap();
        for plane in 0..generator.required_image_count() {
            assert_eq!(generator.generate(plane), generator.generate(plane));
        }
    }

    #[test]
    fn test_cursor_matches_random_access() {
        let mut generator = GrayCodeGenerator::new(12, 5).unwrap();
        let mut produced = Vec::new();
        while let Some(pattern) = generator.next_pattern() {
            produced.push(pattern);
        }
        assert_eq!(produced.len(), generator.required_image_count());
        assert_eq!(generator.current_plane(), produced.len());
        for (plane, pattern) in produced.iter().enumerate() {
            assert_eq!(pattern, &generator.generate(plane).unwrap());
        }

        generator.reset();
        assert_eq!(generator.current_plane(), 0);
        assert_eq!(generator.next_pattern(), Some(produced[0].clone()));
    }

    #[test]
    fn test_capture_sequence_order() {
        let config = PatternConfig::new(4, 2).unwrap();
        assert_eq!(
            config.capture_sequence(true),
            vec![
                CapturePattern::White,
                CapturePattern::Black,
                CapturePattern::Plane(0),
                CapturePattern::Plane(1),
                CapturePattern::Plane(2),
            ]
        );
        assert_eq!(config.capture_sequence(false).len(), 3);
    }

    proptest! {
        #[test]
        fn prop_gray_round_trip(v in any::<u32>()) {
            prop_assert_eq!(from_gray_code(to_gray_code(v)), v);
        }

        #[test]
        fn prop_plane_count_monotonic(a in 1u32..100_000, b in 1u32..100_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(planes_for(lo) <= planes_for(hi));
        }

        #[test]
        fn prop_planes_address_every_column(width in 1u32..5000) {
            let planes = planes_for(width);
            prop_assert!(width as u64 <= 1u64 << planes);
            if planes > 0 {
                prop_assert!(width as u64 > 1u64 << (planes - 1));
            }
        }
    }
}
