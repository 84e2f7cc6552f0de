//! Service and library for reading numeric captchas out of images.
//!
//! The pipeline: decode an uploaded image, binarize it with a fixed
//! contrast-stretch filter, hand it to an OCR engine, and reduce the
//! recognized text to digits.

pub mod binarize;
pub mod bitmap;
pub mod config;
pub mod digits;
pub mod engine;
pub mod engines;
pub mod error;
pub mod preprocessing;
pub mod server;

pub use binarize::{binarize, binarize_default, DEFAULT_CONTRAST};
pub use bitmap::Bitmap;
pub use error::CaptchaError;
