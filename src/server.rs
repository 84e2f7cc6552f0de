use crate::config::Config;
use crate::digits::extract_digits;
use crate::engine::OcrEngine;
use crate::engines::EngineRegistry;
use crate::error::CaptchaError;
use crate::preprocessing::{Pipeline, Preset, StepTiming};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engines: Arc<EngineRegistry>,
    pub config: Arc<Config>,
}

/// Preprocessing stats echoed back in the response
#[derive(Serialize)]
pub struct PreprocessingStats {
    pub preset: String,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Captcha read response
#[derive(Serialize)]
pub struct CaptchaResponse {
    /// Digits recovered from the image; empty if none were found
    pub digits: String,
    /// Raw engine output before digit filtering
    pub raw_text: String,
    pub confidence: f32,
    pub engine: String,
    pub preprocessing: PreprocessingStats,
    pub processing_time_ms: u64,
    pub warnings: Vec<String>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Engine details for the info endpoint
#[derive(Serialize)]
pub struct EngineInfoResponse {
    pub name: String,
    pub description: String,
    pub supported_formats: Vec<String>,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub default_engine: String,
    pub available_engines: Vec<EngineInfoResponse>,
    pub max_file_size_bytes: usize,
    pub default_contrast: f32,
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engines = EngineRegistry::new(&config)?;
    let addr = format!("{}:{}", config.host, config.port);
    let max_file_size = config.max_file_size;

    let state = AppState {
        engines: Arc::new(engines),
        config: Arc::new(config),
    };

    let app = router(state).layer(DefaultBodyLimit::max(max_file_size));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/captcha", post(handle_captcha))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle captcha read requests
async fn handle_captcha(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<CaptchaResponse>, CaptchaError> {
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;
    let mut contrast: Option<f32> = None;
    let mut preset = Preset::default();
    let mut engine_name: Option<String> = None;

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CaptchaError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                file_data = Some(field.bytes().await.map_err(|e| {
                    CaptchaError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
            }
            "contrast" => {
                let text = field.text().await.map_err(|e| {
                    CaptchaError::InvalidRequest(format!("Invalid contrast field: {}", e))
                })?;
                contrast = Some(text.trim().parse().map_err(|_| {
                    CaptchaError::InvalidRequest(format!("Invalid contrast value: {}", text))
                })?);
            }
            "preprocess" => {
                let text = field.text().await.map_err(|e| {
                    CaptchaError::InvalidRequest(format!("Invalid preprocess field: {}", e))
                })?;
                preset = Preset::parse(&text).ok_or_else(|| {
                    CaptchaError::InvalidRequest(format!("Unknown preprocess preset: {}", text))
                })?;
            }
            "engine" => {
                engine_name = Some(field.text().await.map_err(|e| {
                    CaptchaError::InvalidRequest(format!("Invalid engine field: {}", e))
                })?);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    // Validate file was provided
    let data = file_data.ok_or(CaptchaError::MissingFile)?;

    // Check file size
    if data.len() > state.config.max_file_size {
        return Err(CaptchaError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    // Decode the upload in memory; captchas are small
    let image = image::load_from_memory(&data)
        .map_err(|e| CaptchaError::InvalidRequest(format!("Failed to decode image: {}", e)))?;

    // Preprocess
    let contrast = contrast.unwrap_or(state.config.default_contrast);
    let preprocessed = Pipeline::new(preset).with_contrast(contrast).process(image)?;

    // Pick the engine
    let engine: Arc<dyn OcrEngine> = match &engine_name {
        Some(name) => state
            .engines
            .get(name)
            .ok_or_else(|| CaptchaError::UnknownEngine(name.clone()))?,
        None => state
            .engines
            .default()
            .ok_or_else(|| CaptchaError::Internal("No default engine".to_string()))?,
    };

    // Recognize and reduce to digits
    let result = engine.recognize(&preprocessed.image)?;
    let digits = extract_digits(&result.text);

    let mut warnings = result.warnings;
    if digits.is_empty() {
        warnings.push("No digits found in image".to_string());
    }

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Captcha read in {}ms, engine: {}, confidence: {:.2}, digits: {}",
        processing_time_ms,
        engine.name(),
        result.confidence,
        digits.len()
    );

    Ok(Json(CaptchaResponse {
        digits,
        raw_text: result.text,
        confidence: result.confidence,
        engine: engine.name().to_string(),
        preprocessing: PreprocessingStats {
            preset: preprocessed.preset,
            total_time_ms: preprocessed.total_time_ms,
            steps: preprocessed.steps,
        },
        processing_time_ms,
        warnings,
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        default_engine: state.engines.default_name().to_string(),
        available_engines: state
            .engines
            .info()
            .into_iter()
            .map(|e| EngineInfoResponse {
                name: e.name.to_string(),
                description: e.description.to_string(),
                supported_formats: e.supported_formats,
            })
            .collect(),
        max_file_size_bytes: state.config.max_file_size,
        default_contrast: state.config.default_contrast,
    })
}
