//! Contrast-stretch binarization tuned for digit captchas.
//!
//! Collapses an RGBA bitmap to pure black and white: grayscale via the
//! perceptual luma weights, a linear contrast stretch around the midpoint,
//! then a hard threshold. Captcha digits survive, background noise mostly
//! does not.

use crate::bitmap::{Bitmap, CHANNELS};
use crate::error::CaptchaError;

/// Default contrast stretch factor.
pub const DEFAULT_CONTRAST: f32 = 1.5;

/// Rec. 601 luma weights
const LUMA_R: f32 = 0.299;
const LUMA_G: f32 = 0.587;
const LUMA_B: f32 = 0.114;

/// Midpoint used both as the stretch pivot and the threshold cutoff.
const MIDPOINT: f32 = 128.0;

/// Binarize a bitmap at the given contrast factor.
///
/// Each pixel is processed independently: luminance, contrast stretch,
/// then threshold at the midpoint. Output channels are exactly 0 or 255,
/// R == G == B, and alpha is copied through unchanged. A luminance landing
/// exactly on the midpoint goes to black.
///
/// Contrast factors at or above 2.59 drive the stretch denominator to zero
/// or negative and are rejected, as are non-positive factors, rather than
/// letting NaN leak into the output.
pub fn binarize(bitmap: &Bitmap, contrast: f32) -> Result<Bitmap, CaptchaError> {
    let factor = stretch_factor(contrast)?;

    let src = bitmap.data();
    let mut out = Vec::with_capacity(src.len());

    for px in src.chunks_exact(CHANNELS) {
        let gray = LUMA_R * px[0] as f32 + LUMA_G * px[1] as f32 + LUMA_B * px[2] as f32;
        let adjusted = (factor * (gray - MIDPOINT) + MIDPOINT).clamp(0.0, 255.0);
        let value = if adjusted > MIDPOINT { 255 } else { 0 };

        out.push(value);
        out.push(value);
        out.push(value);
        out.push(px[3]);
    }

    Bitmap::from_raw(bitmap.width(), bitmap.height(), out)
}

/// Binarize at the default contrast factor.
pub fn binarize_default(bitmap: &Bitmap) -> Result<Bitmap, CaptchaError> {
    binarize(bitmap, DEFAULT_CONTRAST)
}

/// Compute the linear stretch factor for a contrast setting.
///
/// factor = (259 * (c*100 + 255)) / (255 * (259 - c*100))
fn stretch_factor(contrast: f32) -> Result<f32, CaptchaError> {
    if !contrast.is_finite() || contrast <= 0.0 {
        return Err(CaptchaError::DegenerateContrast(contrast));
    }

    let c = contrast * 100.0;
    let denominator = 255.0 * (259.0 - c);
    if denominator <= 0.0 {
        return Err(CaptchaError::DegenerateContrast(contrast));
    }

    Ok((259.0 * (c + 255.0)) / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(width: u32, height: u32, pixels: &[[u8; 4]]) -> Bitmap {
        let data: Vec<u8> = pixels.iter().flatten().copied().collect();
        Bitmap::from_raw(width, height, data).unwrap()
    }

    #[test]
    fn test_dark_and_light_pixels_collapse() {
        let input = bitmap(2, 1, &[[10, 10, 10, 255], [250, 250, 250, 255]]);
        let result = binarize(&input, 1.5).unwrap();

        assert_eq!(result.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(result.pixel(1, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_midpoint_gray_goes_black() {
        // gray = 128 stretches to exactly 128; the cutoff is strict
        let input = bitmap(1, 1, &[[128, 128, 128, 255]]);
        let result = binarize(&input, 1.5).unwrap();
        assert_eq!(result.pixel(0, 0), [0, 0, 0, 255]);
    }

    #[test]
    fn test_output_is_pure_black_and_white() {
        let pixels: Vec<[u8; 4]> = (0..=255u16)
            .map(|v| [v as u8, (255 - v) as u8, (v / 2) as u8, 200])
            .collect();
        let input = bitmap(16, 16, &pixels);

        let result = binarize(&input, 1.5).unwrap();
        for px in result.data().chunks_exact(4) {
            assert!(px[0] == 0 || px[0] == 255, "expected binary, got {}", px[0]);
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
        }
    }

    #[test]
    fn test_alpha_is_preserved() {
        let input = bitmap(
            2,
            2,
            &[
                [0, 0, 0, 0],
                [255, 255, 255, 17],
                [7, 7, 7, 128],
                [200, 200, 200, 255],
            ],
        );
        let result = binarize(&input, 1.5).unwrap();

        for (src, dst) in input
            .data()
            .chunks_exact(4)
            .zip(result.data().chunks_exact(4))
        {
            assert_eq!(src[3], dst[3]);
        }
    }

    #[test]
    fn test_dimensions_preserved() {
        let input = Bitmap::from_raw(7, 3, vec![90u8; 7 * 3 * 4]).unwrap();
        let result = binarize(&input, 1.5).unwrap();
        assert_eq!(result.width(), 7);
        assert_eq!(result.height(), 3);
    }

    #[test]
    fn test_idempotent_at_default_contrast() {
        let pixels: Vec<[u8; 4]> = (0..64u8).map(|v| [v * 4, v * 3, v * 2, 255]).collect();
        let input = bitmap(8, 8, &pixels);

        let once = binarize_default(&input).unwrap();
        let twice = binarize_default(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_deterministic() {
        let input = bitmap(2, 1, &[[77, 133, 201, 9], [13, 13, 13, 255]]);
        let a = binarize(&input, 1.2).unwrap();
        let b = binarize(&input, 1.2).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_degenerate_contrast() {
        let input = bitmap(1, 1, &[[128, 128, 128, 255]]);

        // 2.59 * 100 zeroes the denominator
        let err = binarize(&input, 2.59).unwrap_err();
        assert!(matches!(err, CaptchaError::DegenerateContrast(_)));

        // Anything above flips the denominator sign
        let err = binarize(&input, 3.0).unwrap_err();
        assert!(matches!(err, CaptchaError::DegenerateContrast(_)));
    }

    #[test]
    fn test_rejects_non_positive_contrast() {
        let input = bitmap(1, 1, &[[128, 128, 128, 255]]);

        assert!(binarize(&input, 0.0).is_err());
        assert!(binarize(&input, -1.5).is_err());
        assert!(binarize(&input, f32::NAN).is_err());
    }

    #[test]
    fn test_contrast_just_below_limit_is_accepted() {
        let input = bitmap(1, 1, &[[200, 200, 200, 255]]);
        let result = binarize(&input, 2.58).unwrap();
        assert_eq!(result.pixel(0, 0), [255, 255, 255, 255]);
    }
}
