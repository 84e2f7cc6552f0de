use crate::binarize::DEFAULT_CONTRAST;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "captcha-ocr-server")]
#[command(about = "OCR service that reads numeric captchas out of images")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "CAPTCHA_OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "CAPTCHA_OCR_PORT", default_value = "9292")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 10MB, captchas are small)
    #[arg(long, env = "CAPTCHA_OCR_MAX_FILE_SIZE", default_value = "10485760")]
    pub max_file_size: usize,

    /// Default contrast factor for the binarize preprocessing step
    #[arg(long, env = "CAPTCHA_OCR_CONTRAST", default_value_t = DEFAULT_CONTRAST)]
    pub contrast: f32,

    /// Default OCR engine (falls back to the first compiled-in engine)
    #[arg(long, env = "CAPTCHA_OCR_ENGINE")]
    pub engine: Option<String>,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub default_contrast: f32,
    pub default_engine: Option<String>,
    pub tessdata_path: Option<String>,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            default_contrast: args.contrast,
            default_engine: args.engine,
            tessdata_path: args.tessdata_path,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9292,
            max_file_size: 10 * 1024 * 1024,
            default_contrast: DEFAULT_CONTRAST,
            default_engine: None,
            tessdata_path: None,
        }
    }
}
