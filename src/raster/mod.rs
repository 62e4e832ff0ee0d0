//! Owned monochrome raster shared by patterns, captured frames and masks.

use crate::error::ConfigurationError;

/// 8-bit single channel image stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// A projector pattern produced by the encoder.
pub type Pattern = Raster;

/// A camera frame captured while a pattern was displayed.
pub type CapturedFrame = Raster;

impl Raster {
    /// Create a black raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }

    /// Create a raster with every pixel set to `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; pixel_count(width, height)],
        }
    }

    /// Wrap an existing row-major buffer.
    pub fn from_vec(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ConfigurationError> {
        let expected = pixel_count(width, height);
        if data.len() != expected {
            return Err(ConfigurationError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Build a raster by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> u8) -> Self {
        let mut data = Vec::with_capacity(pixel_count(width, height));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Row-major pixel data.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Linear index of `(x, y)`, or `None` outside the raster.
    #[inline]
    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        linear_index(self.width, self.height, x, y)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        self.index_of(x, y).map(|idx| self.data[idx])
    }

    /// Set a pixel; writes outside the raster are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        if let Some(idx) = self.index_of(x, y) {
            self.data[idx] = value;
        }
    }

    /// Convert to an `image` buffer for encoding or display.
    pub fn to_gray_image(&self) -> image::GrayImage {
        // `data` always holds width * height bytes, so `from_raw` cannot fail.
        image::GrayImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| image::GrayImage::new(self.width, self.height))
    }

    pub fn from_gray_image(image: image::GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}

/// Number of pixels in a `width x height` grid.
#[inline]
pub(crate) fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Row-major index of `(x, y)` in a `width x height` grid.
#[inline]
pub(crate) fn linear_index(width: u32, height: u32, x: u32, y: u32) -> Option<usize> {
    if x < width && y < height {
        Some(y as usize * width as usize + x as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        let err = Raster::from_vec(4, 4, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::BufferSize {
                width: 4,
                height: 4,
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_indexing_is_row_major() {
        let raster = Raster::from_fn(3, 2, |x, y| (y * 3 + x) as u8);
        assert_eq!(raster.as_slice(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(raster.get(2, 1), Some(5));
        assert_eq!(raster.get(3, 0), None);
        assert_eq!(raster.get(0, 2), None);
    }

    #[test]
    fn test_set_ignores_out_of_bounds() {
        let mut raster = Raster::new(2, 2);
        raster.set(1, 1, 255);
        raster.set(5, 5, 255);
        assert_eq!(raster.as_slice(), &[0, 0, 0, 255]);
    }

    #[test]
    fn test_gray_image_conversion() {
        let raster = Raster::from_fn(5, 3, |x, y| (x * 10 + y) as u8);
        let image = raster.to_gray_image();
        assert_eq!(image.get_pixel(4, 2).0, [42]);
        assert_eq!(Raster::from_gray_image(image), raster);
    }

    #[test]
    fn test_gray_image_keeps_row_major_layout() {
        let raster = Raster::from_fn(5, 3, |x, y| (y * 10 + x) as u8);
        let image = raster.to_gray_image();
        assert_eq!(image.dimensions(), (5, 3));
        assert_eq!(image.as_raw().as_slice(), raster.as_slice());
        assert_eq!(image.get_pixel(4, 1).0, [14]);
        assert_eq!(image.get_pixel(0, 2).0, [20]);
    }
}
