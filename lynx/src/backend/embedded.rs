//! Adapter for the locally embedded Tesseract engine.
//!
//! The engine handle is loaded eagerly at startup (model/weight load is
//! expensive) and shared across all requests. Tesseract handles are not
//! safe for concurrent inference, so every recognition serializes through
//! one async mutex and runs on a blocking thread. This lock is the
//! system's single concurrency bottleneck.

use std::io::Cursor;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use image::ImageReader;
use leptess::LepTess;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::backend::params::BackendParams;
use crate::backend::{Capabilities, OcrEngine, RawOcrOutcome};
use crate::config::EmbeddedConfig;
use crate::error::{GatewayError, Result};
use crate::models::OcrStatus;
use crate::sanitize::{SanitizedImage, ALLOWED_MIME_TYPES};

pub struct EmbeddedOcrEngine {
    engine: Arc<Mutex<LepTess>>,
    languages: String,
}

impl EmbeddedOcrEngine {
    /// Eagerly initializes the engine for the configured languages.
    /// Called once at startup, never per request.
    pub fn new(config: &EmbeddedConfig) -> Result<Self> {
        let engine = LepTess::new(config.datapath.as_deref(), &config.languages)
            .map_err(|e| GatewayError::EngineInit(format!("Tesseract init failed: {e}")))?;

        tracing::info!(languages = %config.languages, "embedded OCR engine initialized");

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
            languages: config.languages.clone(),
        })
    }
}

#[async_trait]
impl OcrEngine for EmbeddedOcrEngine {
    async fn recognize(
        &self,
        image: &SanitizedImage,
        params: &BackendParams,
    ) -> Result<RawOcrOutcome> {
        let language = match params {
            BackendParams::Embedded(p) => p.language.clone(),
            BackendParams::Remote(_) => {
                return Err(GatewayError::Internal(
                    "remote params handed to the embedded adapter".to_string(),
                ))
            }
        };

        if let Some(requested) = &language {
            if requested != &self.languages {
                tracing::debug!(
                    requested = %requested,
                    loaded = %self.languages,
                    "language hint differs from the loaded model; using loaded model"
                );
            }
        }

        let started = Instant::now();
        let timestamp = epoch_seconds();

        let buffer = prepare_for_engine(&image.bytes)?;
        let engine = Arc::clone(&self.engine);

        let (text, confidence) = tokio::task::spawn_blocking(move || {
            let mut engine = engine.blocking_lock();
            engine.set_image_from_mem(&buffer).map_err(|e| {
                GatewayError::Backend {
                    code: OcrStatus::FAILURE_CODE,
                    message: format!("Failed to set image: {e}"),
                }
            })?;
            let text = engine.get_utf8_text().map_err(|e| GatewayError::Backend {
                code: OcrStatus::FAILURE_CODE,
                message: format!("Failed to extract text: {e}"),
            })?;
            let confidence = engine.mean_text_conf();
            Ok::<_, GatewayError>((text, confidence))
        })
        .await
        .map_err(|e| GatewayError::Internal(format!("OCR task panicked: {e}")))??;

        let elements = lines_to_raw_elements(&text, confidence);
        let elapsed = started.elapsed().as_secs_f64();

        tracing::info!(
            blocks = elements.len(),
            elapsed_secs = elapsed,
            "embedded recognition complete"
        );

        Ok(RawOcrOutcome {
            code: OcrStatus::SUCCESS_CODE,
            data: Value::Array(elements),
            time: elapsed,
            timestamp,
        })
    }

    async fn describe(&self) -> Result<Capabilities> {
        Ok(capabilities_doc(&self.languages))
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Decodes the sanitized bytes into an in-memory buffer and re-encodes as
/// PNG, the one input format the engine ingests reliably.
fn prepare_for_engine(bytes: &[u8]) -> Result<Vec<u8>> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| GatewayError::InvalidEncoding(format!("Failed to read image: {e}")))?;

    let img = reader
        .decode()
        .map_err(|e| GatewayError::InvalidEncoding(format!("Failed to decode image: {e}")))?;

    let rgb = image::DynamicImage::ImageRgb8(img.to_rgb8());
    let mut output = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| GatewayError::Internal(format!("Failed to encode image: {e}")))?;

    Ok(output)
}

/// One raw element per recognized line, carrying the engine's native field
/// names. Interpreting these is the response normalizer's job.
fn lines_to_raw_elements(text: &str, mean_conf: i32) -> Vec<Value> {
    let score = f64::from(mean_conf.clamp(0, 100)) / 100.0;

    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(json!({
                    "rec_text": trimmed,
                    "rec_score": score,
                    "bbox": [],
                }))
            }
        })
        .collect()
}

fn capabilities_doc(languages: &str) -> Capabilities {
    let formats: Vec<&str> = ALLOWED_MIME_TYPES
        .iter()
        .map(|m| m.trim_start_matches("image/"))
        .collect();

    json!({
        "engine": "tesseract",
        "languages": languages,
        "supported_formats": formats,
        "features": {
            "text_detection": true,
            "text_recognition": true,
            "multi_language": true,
            "orientation_correction": false,
        },
        "parameters": {
            "ocr.language": {
                "type": "string",
                "default": languages,
                "description": "Tesseract language codes, '+'-separated; loaded at startup",
            },
        },
    })
}
