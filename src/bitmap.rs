//! In-memory RGBA bitmap type shared by the preprocessing steps.

use crate::error::CaptchaError;
use image::{DynamicImage, RgbaImage};

/// Number of channels per pixel (RGBA).
pub const CHANNELS: usize = 4;

/// A row-major RGBA bitmap with 8-bit channels, origin top-left.
///
/// Bitmaps are immutable value types: preprocessing steps consume one and
/// return a new buffer rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// Build a bitmap from raw RGBA bytes, validating dimensions and length.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CaptchaError> {
        if width == 0 || height == 0 {
            return Err(CaptchaError::InvalidBitmap(format!(
                "dimensions must be at least 1x1, got {}x{}",
                width, height
            )));
        }

        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(CaptchaError::InvalidBitmap(format!(
                "buffer length {} does not match {}x{}x4 = {}",
                data.len(),
                width,
                height,
                expected
            )));
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert a decoded image into a bitmap, expanding to RGBA as needed.
    pub fn from_image(image: &DynamicImage) -> Result<Self, CaptchaError> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_raw(width, height, rgba.into_raw())
    }

    /// Convert back into a `DynamicImage` for the OCR engines.
    pub fn into_image(self) -> DynamicImage {
        // Buffer length was validated at construction
        let rgba = RgbaImage::from_raw(self.width, self.height, self.data)
            .expect("bitmap buffer length invariant");
        DynamicImage::ImageRgba8(rgba)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGBA channels of the pixel at (x, y). Panics if out of bounds;
    /// intended for tests and diagnostics.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_accepts_valid_buffer() {
        let bmp = Bitmap::from_raw(2, 2, vec![0u8; 16]).unwrap();
        assert_eq!(bmp.width(), 2);
        assert_eq!(bmp.height(), 2);
        assert_eq!(bmp.data().len(), 16);
    }

    #[test]
    fn test_from_raw_rejects_zero_dimension() {
        let err = Bitmap::from_raw(0, 4, vec![]).unwrap_err();
        assert!(matches!(err, CaptchaError::InvalidBitmap(_)));

        let err = Bitmap::from_raw(4, 0, vec![]).unwrap_err();
        assert!(matches!(err, CaptchaError::InvalidBitmap(_)));
    }

    #[test]
    fn test_from_raw_rejects_length_mismatch() {
        let err = Bitmap::from_raw(2, 2, vec![0u8; 15]).unwrap_err();
        assert!(matches!(err, CaptchaError::InvalidBitmap(_)));
    }

    #[test]
    fn test_image_round_trip_preserves_pixels() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(1, 1, image::Rgba([10, 20, 30, 40]));

        let bmp = Bitmap::from_image(&DynamicImage::ImageRgba8(img)).unwrap();
        assert_eq!(bmp.pixel(1, 1), [10, 20, 30, 40]);

        let back = bmp.into_image().to_rgba8();
        assert_eq!(back.get_pixel(1, 1).0, [10, 20, 30, 40]);
    }
}
