use crate::error::CaptchaError;
use image::DynamicImage;

/// OCR recognition result
#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
    pub confidence: f32,
    pub warnings: Vec<String>,
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "tesseract")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text in an already-decoded image
    fn recognize(&self, image: &DynamicImage) -> Result<OcrResult, CaptchaError>;

    /// Get supported upload MIME types
    fn supported_formats(&self) -> Vec<String>;
}
