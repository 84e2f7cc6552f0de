//! Tesseract engine implementation
//!
//! Tesseract-based OCR engine. Better for noisy/messy captcha renders.
//! Uses tesseract-static crate for static linking (no system dependencies).
//! Downloads tessdata (training data) automatically on first use.

use crate::config::Config;
use crate::engine::{OcrEngine, OcrResult};
use crate::error::CaptchaError;
use image::DynamicImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tesseract_static::tesseract::Tesseract;

/// Language whose training data we fetch; digits are a subset of eng.
const LANGUAGE: &str = "eng";

/// Restrict recognition to the characters a numeric captcha can contain.
const DIGIT_WHITELIST: &str = "0123456789";

/// Tesseract OCR Engine
pub struct TesseractEngine {
    /// Path to tessdata directory
    tessdata_path: String,
}

impl TesseractEngine {
    /// Create a new Tesseract-based OCR engine
    pub fn new(config: &Config) -> Result<Self, CaptchaError> {
        // Ensure tessdata is available (download if needed)
        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(LANGUAGE)?,
        };

        // Validate that tessdata is accessible by doing a test initialization
        let test_tess = Tesseract::new(Some(&tessdata_path), Some(LANGUAGE)).map_err(|e| {
            CaptchaError::InitializationError(format!("Failed to initialize Tesseract: {}", e))
        })?;
        drop(test_tess);

        tracing::info!("Tesseract engine initialized (tessdata: {})", tessdata_path);

        Ok(Self { tessdata_path })
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine with a digits-only whitelist"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, CaptchaError> {
        // Convert to RGB8 for consistent handling
        let rgb_img = image.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        // Convert to BMP in memory (BMP is always supported by leptonica)
        let mut bmp_data = Vec::new();
        {
            let mut cursor = std::io::Cursor::new(&mut bmp_data);
            rgb_img
                .write_to(&mut cursor, image::ImageFormat::Bmp)
                .map_err(|e| {
                    CaptchaError::ProcessingError(format!("Failed to convert to BMP: {}", e))
                })?;
        }

        tracing::debug!(
            "Processing image: {}x{}, BMP size: {} bytes",
            width,
            height,
            bmp_data.len()
        );

        let mut tess = Tesseract::new(Some(&self.tessdata_path), Some(LANGUAGE)).map_err(|e| {
            CaptchaError::ProcessingError(format!("Failed to create Tesseract: {}", e))
        })?;

        tess = tess
            .set_variable("tessedit_char_whitelist", DIGIT_WHITELIST)
            .map_err(|e| {
                CaptchaError::ProcessingError(format!("Failed to set digit whitelist: {}", e))
            })?;

        tess = tess.set_image_from_mem(&bmp_data).map_err(|e| {
            CaptchaError::ProcessingError(format!(
                "Failed to set image ({}x{}, {} bytes): {}",
                width,
                height,
                bmp_data.len(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| CaptchaError::ProcessingError(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| CaptchaError::ProcessingError(format!("Failed to get text: {}", e)))?;

        // Get confidence score (0-100 scale, convert to 0.0-1.0)
        let confidence = tess.mean_text_conf() as f32 / 100.0;

        Ok(OcrResult {
            text: text.trim().to_string(),
            confidence,
            warnings: Vec::new(),
        })
    }

    fn supported_formats(&self) -> Vec<String> {
        vec![
            "image/png".to_string(),
            "image/jpeg".to_string(),
            "image/gif".to_string(),
            "image/bmp".to_string(),
            "image/webp".to_string(),
            "image/tiff".to_string(),
        ]
    }
}

// ============================================================================
// Tessdata download helpers
// ============================================================================

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, CaptchaError> {
    // Get cache directory for tessdata
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("captcha-ocr")
        .join("tessdata");

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        CaptchaError::InitializationError(format!("Failed to create tessdata directory: {}", e))
    })?;

    let traineddata_file = format!("{}.traineddata", language);
    let traineddata_path = cache_dir.join(&traineddata_file);

    // Download if not cached
    if !traineddata_path.exists() {
        let url = tessdata_url(language);
        tracing::info!(
            "Downloading tessdata for '{}' (this may take a moment)...",
            language
        );
        download_file(&url, &traineddata_path)?;
        tracing::info!("Downloaded tessdata to {:?}", traineddata_path);
    } else {
        tracing::info!("Using cached tessdata from {:?}", cache_dir);
    }

    // Return the directory path (Tesseract expects the directory, not the file)
    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| CaptchaError::InitializationError("Invalid tessdata path".to_string()))
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // Use tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), CaptchaError> {
    let response = ureq::get(url).call().map_err(|e| {
        CaptchaError::InitializationError(format!("Failed to download tessdata: {}", e))
    })?;

    let mut file = File::create(path).map_err(|e| {
        CaptchaError::InitializationError(format!("Failed to create tessdata file: {}", e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        CaptchaError::InitializationError(format!("Failed to read tessdata response: {}", e))
    })?;

    file.write_all(&buffer).map_err(|e| {
        CaptchaError::InitializationError(format!("Failed to write tessdata file: {}", e))
    })?;

    Ok(())
}
