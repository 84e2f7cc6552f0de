use crate::binarize::{self, DEFAULT_CONTRAST};
use crate::bitmap::Bitmap;
use crate::error::CaptchaError;
use image::DynamicImage;
use serde::Serialize;
use std::time::Instant;

/// Preprocessing preset names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// Hand the image to the engine untouched (0ms overhead)
    None,
    /// Contrast-stretch binarization tuned for digit captchas
    #[default]
    Binarize,
}

impl Preset {
    /// Parse from a request parameter string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Self::None),
            "binarize" => Some(Self::Binarize),
            _ => None,
        }
    }

    /// Get the preset name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Binarize => "binarize",
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone, Serialize)]
pub struct PreprocessingResult {
    /// Preprocessed image (not serialized)
    #[serde(skip)]
    pub image: DynamicImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Preset used
    pub preset: String,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Preprocessing pipeline that applies steps based on preset
pub struct Pipeline {
    preset: Preset,
    contrast: f32,
}

impl Pipeline {
    pub fn new(preset: Preset) -> Self {
        Self {
            preset,
            contrast: DEFAULT_CONTRAST,
        }
    }

    /// Override the contrast factor used by the binarize step.
    pub fn with_contrast(mut self, contrast: f32) -> Self {
        self.contrast = contrast;
        self
    }

    /// Process an image according to the configured preset
    pub fn process(&self, image: DynamicImage) -> Result<PreprocessingResult, CaptchaError> {
        let start = Instant::now();

        if self.preset == Preset::None {
            return Ok(PreprocessingResult {
                image,
                total_time_ms: 0,
                preset: "none".to_string(),
                steps: vec![],
            });
        }

        let mut steps_timing = Vec::new();
        let contrast = self.contrast;

        let img = self.run_step("binarize", image, &mut steps_timing, |img| {
            let bitmap = Bitmap::from_image(&img)?;
            Ok(binarize::binarize(&bitmap, contrast)?.into_image())
        })?;

        Ok(PreprocessingResult {
            image: img,
            total_time_ms: start.elapsed().as_millis() as u64,
            preset: self.preset.as_str().to_string(),
            steps: steps_timing,
        })
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: DynamicImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<DynamicImage, CaptchaError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, CaptchaError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_preset_parsing() {
        assert_eq!(Preset::parse("none"), Some(Preset::None));
        assert_eq!(Preset::parse("Binarize"), Some(Preset::Binarize));
        assert_eq!(Preset::parse("aggressive"), None);
    }

    #[test]
    fn test_none_preset_passes_image_through() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([90, 90, 90, 255]));
        let pipeline = Pipeline::new(Preset::None);

        let result = pipeline.process(DynamicImage::ImageRgba8(img)).unwrap();
        assert!(result.steps.is_empty());
        assert_eq!(result.image.to_rgba8().get_pixel(0, 0).0, [90, 90, 90, 255]);
    }

    #[test]
    fn test_binarize_preset_produces_binary_image() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([230, 230, 230, 255]));
        img.put_pixel(1, 1, Rgba([20, 20, 20, 255]));

        let pipeline = Pipeline::new(Preset::Binarize);
        let result = pipeline.process(DynamicImage::ImageRgba8(img)).unwrap();

        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].name, "binarize");

        let out = result.image.to_rgba8();
        assert_eq!(out.get_pixel(1, 1).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_pipeline_propagates_degenerate_contrast() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([128, 128, 128, 255]));
        let pipeline = Pipeline::new(Preset::Binarize).with_contrast(2.59);

        let err = pipeline.process(DynamicImage::ImageRgba8(img)).unwrap_err();
        assert!(matches!(err, CaptchaError::DegenerateContrast(_)));
    }
}
