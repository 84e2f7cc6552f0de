//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.

use crate::config::Config;
use crate::engine::{OcrEngine, OcrResult};
use crate::error::CaptchaError;
use image::DynamicImage;
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// OCR Engine wrapping the ocrs library
pub struct OcrsEngine {
    engine: Arc<OcrsOcrEngine>,
}

impl OcrsEngine {
    /// Create a new OCR engine, downloading models if needed
    pub fn new(_config: &Config) -> Result<Self, CaptchaError> {
        tracing::info!("Initializing ocrs OCR engine...");

        // Load models (will download if not cached)
        let detection_model_path =
            ensure_model_downloaded(DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path =
            ensure_model_downloaded(RECOGNITION_MODEL_URL, "text-recognition.rten")?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            CaptchaError::InitializationError(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            CaptchaError::InitializationError(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            CaptchaError::InitializationError(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self {
            engine: Arc::new(engine),
        })
    }
}

impl OcrEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies required"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, CaptchaError> {
        // Convert to RGB8 (HWC format, which is what ImageSource::from_bytes expects)
        let rgb_img = image.to_rgb8();
        let dimensions = rgb_img.dimensions();

        let img_source = ImageSource::from_bytes(rgb_img.as_raw(), dimensions).map_err(|e| {
            CaptchaError::ProcessingError(format!("Failed to create image source: {}", e))
        })?;

        let ocr_input = self.engine.prepare_input(img_source).map_err(|e| {
            CaptchaError::ProcessingError(format!("Failed to prepare input: {}", e))
        })?;

        // Detect words
        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| CaptchaError::ProcessingError(format!("Failed to detect words: {}", e)))?;

        // Group words into lines
        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        // Recognize text in each line
        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| {
                CaptchaError::ProcessingError(format!("Failed to recognize text: {}", e))
            })?;

        // Combine all lines into a single string
        let text: String = line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");

        // ocrs has no per-character scores, estimate from digit quality
        let confidence = calculate_confidence(&text);

        Ok(OcrResult {
            text,
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
// Confidence scoring heuristics
// ============================================================================

/// Estimate confidence for a digit-captcha recognition.
///
/// Since ocrs doesn't provide per-character confidence scores, we score the
/// recognized text on how much it looks like a captcha answer: mostly
/// digits, a plausible length, and no suspicious repeated runs.
fn calculate_confidence(text: &str) -> f32 {
    if text.trim().is_empty() {
        return 0.0;
    }

    let digit_score = analyze_digit_ratio(text);
    let length_score = analyze_digit_count(text);
    let repetition_score = detect_repetition(text);

    let confidence = 0.50 * digit_score + 0.30 * length_score + 0.20 * repetition_score;

    confidence.clamp(0.0, 1.0)
}

/// Fraction of non-whitespace characters that are digits.
///
/// Letters and punctuation in the output mean the engine was guessing.
fn analyze_digit_ratio(text: &str) -> f32 {
    let total = text.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return 0.0;
    }

    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
    digits as f32 / total as f32
}

/// Score the number of recovered digits against typical captcha lengths.
fn analyze_digit_count(text: &str) -> f32 {
    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();

    match digits {
        0 => 0.0,
        1..=2 => 0.5,
        3..=8 => 1.0,
        9..=12 => 0.6,
        _ => 0.3,
    }
}

/// Detect repeated character runs.
///
/// Patterns like "11111" or "####" often indicate OCR confusion rather
/// than a real captcha value.
fn detect_repetition(text: &str) -> f32 {
    let mut max_repeat = 1;
    let mut current = 1;
    let mut prev: Option<char> = None;

    for c in text.chars() {
        if Some(c) == prev && !c.is_whitespace() {
            current += 1;
            max_repeat = max_repeat.max(current);
        } else {
            current = 1;
        }
        prev = Some(c);
    }

    match max_repeat {
        1..=3 => 1.0,
        4..=5 => 0.7,
        _ => 0.3,
    }
}

// ============================================================================
// Model download helpers
// ============================================================================

/// Ensure model is downloaded and return its path
fn ensure_model_downloaded(url: &str, filename: &str) -> Result<std::path::PathBuf, CaptchaError> {
    // Get cache directory
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("captcha-ocr");

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        CaptchaError::InitializationError(format!("Failed to create cache directory: {}", e))
    })?;

    let model_path = cache_dir.join(filename);

    // Download if not cached
    if !model_path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &model_path)?;
        tracing::info!("Downloaded {} to {:?}", filename, model_path);
    } else {
        tracing::info!("Using cached model from {:?}", model_path);
    }

    Ok(model_path)
}

/// Download a file from URL to path using ureq
fn download_file(url: &str, path: &Path) -> Result<(), CaptchaError> {
    let response = ureq::get(url).call().map_err(|e| {
        CaptchaError::InitializationError(format!("Failed to download model: {}", e))
    })?;

    let mut file = File::create(path).map_err(|e| {
        CaptchaError::InitializationError(format!("Failed to create model file: {}", e))
    })?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        CaptchaError::InitializationError(format!("Failed to read response body: {}", e))
    })?;

    file.write_all(&buffer).map_err(|e| {
        CaptchaError::InitializationError(format!("Failed to write model file: {}", e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_returns_zero() {
        assert_eq!(calculate_confidence(""), 0.0);
        assert_eq!(calculate_confidence("   "), 0.0);
    }

    #[test]
    fn test_clean_digits_high_confidence() {
        let confidence = calculate_confidence("482913");
        assert!(confidence > 0.9, "Expected > 0.9, got {}", confidence);
    }

    #[test]
    fn test_letters_only_low_confidence() {
        let confidence = calculate_confidence("hello");
        assert!(confidence < 0.3, "Expected < 0.3, got {}", confidence);
    }

    #[test]
    fn test_mixed_output_middling_confidence() {
        let clean = calculate_confidence("482913");
        let noisy = calculate_confidence("4a8b29l3");
        assert!(noisy < clean, "Expected {} < {}", noisy, clean);
        assert!(noisy > 0.3, "Expected > 0.3, got {}", noisy);
    }

    #[test]
    fn test_repeated_digits_lower_confidence() {
        let clean = calculate_confidence("482913");
        let repeated = calculate_confidence("111111");
        assert!(repeated < clean, "Expected {} < {}", repeated, clean);
    }

    #[test]
    fn test_digit_ratio() {
        assert_eq!(analyze_digit_ratio("1234"), 1.0);
        assert_eq!(analyze_digit_ratio("abcd"), 0.0);
        assert!((analyze_digit_ratio("12ab") - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_digit_count_prefers_captcha_lengths() {
        assert_eq!(analyze_digit_count("4829"), 1.0);
        assert_eq!(analyze_digit_count(""), 0.0);
        assert!(analyze_digit_count("12345678901234") < 0.5);
    }
}
