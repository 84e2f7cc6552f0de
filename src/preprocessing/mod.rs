//! Image preprocessing applied before OCR.
//!
//! Captchas are low-resolution and deliberately noisy; collapsing them to
//! pure black and white before recognition measurably improves digit OCR.

pub mod pipeline;

pub use pipeline::{Pipeline, PreprocessingResult, Preset, StepTiming};
