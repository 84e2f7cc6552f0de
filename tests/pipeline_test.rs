//! End-to-end tests for the preprocessing pipeline and digit post-processing.
//!
//! These run entirely in memory; OCR engines need model downloads and are
//! covered separately by their own unit tests.

use captcha_ocr::digits::extract_digits;
use captcha_ocr::preprocessing::{Pipeline, Preset};
use captcha_ocr::{binarize, binarize_default, Bitmap, CaptchaError, DEFAULT_CONTRAST};
use image::{DynamicImage, Rgba, RgbaImage};

/// A synthetic captcha-ish image: light background, dark digit strokes,
/// mid-grey noise speckles.
fn synthetic_captcha() -> DynamicImage {
    let mut img = RgbaImage::from_pixel(60, 20, Rgba([235, 235, 228, 255]));

    // Vertical "strokes"
    for x in [8u32, 20, 32, 44] {
        for y in 4..16 {
            img.put_pixel(x, y, Rgba([25, 22, 30, 255]));
            img.put_pixel(x + 1, y, Rgba([25, 22, 30, 255]));
        }
    }

    // Speckle noise that should wash out to white
    for i in 0..30u32 {
        let x = (i * 7) % 60;
        let y = (i * 11) % 20;
        if img.get_pixel(x, y).0[0] > 200 {
            img.put_pixel(x, y, Rgba([170, 170, 170, 255]));
        }
    }

    DynamicImage::ImageRgba8(img)
}

#[test]
fn binarize_preset_yields_pure_black_and_white() {
    let result = Pipeline::new(Preset::Binarize)
        .process(synthetic_captcha())
        .unwrap();

    let out = result.image.to_rgba8();
    assert_eq!(out.dimensions(), (60, 20));

    for px in out.pixels() {
        assert!(px.0[0] == 0 || px.0[0] == 255);
        assert_eq!(px.0[0], px.0[1]);
        assert_eq!(px.0[1], px.0[2]);
        assert_eq!(px.0[3], 255);
    }

    // Strokes survive, background and speckles collapse to white
    assert_eq!(out.get_pixel(8, 10).0, [0, 0, 0, 255]);
    assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
    assert_eq!(out.get_pixel(7, 11).0, [255, 255, 255, 255]);
}

#[test]
fn binarizing_twice_is_stable() {
    let bitmap = Bitmap::from_image(&synthetic_captcha()).unwrap();
    let once = binarize_default(&bitmap).unwrap();
    let twice = binarize_default(&once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn concurrent_binarization_is_deterministic() {
    let bitmap = Bitmap::from_image(&synthetic_captcha()).unwrap();
    let expected = binarize(&bitmap, DEFAULT_CONTRAST).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let input = bitmap.clone();
            std::thread::spawn(move || binarize(&input, DEFAULT_CONTRAST).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn degenerate_contrast_is_rejected_end_to_end() {
    let err = Pipeline::new(Preset::Binarize)
        .with_contrast(2.59)
        .process(synthetic_captcha())
        .unwrap_err();
    assert!(matches!(err, CaptchaError::DegenerateContrast(_)));
}

#[test]
fn ocr_output_reduces_to_digits() {
    // Typical noisy engine output for a 6-digit captcha
    assert_eq!(extract_digits("4 8 2\n9I3 ."), "48293");
    assert_eq!(extract_digits("482913"), "482913");
    assert_eq!(extract_digits("captcha"), "");
}
