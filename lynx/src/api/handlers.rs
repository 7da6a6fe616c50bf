//! HTTP handlers: thin glue between the wire and the core pipeline.
//!
//! Each recognize route runs the sanitizer, the dispatcher, the normalizer
//! and the negotiator, and only decides how to put the rendered result on
//! the wire.

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::api::state::AppState;
use crate::error::{GatewayError, Result};
use crate::models::{ImageUploadResponse, OcrOptions, OcrRequest, OcrResponse, OutputFormat};
use crate::render::{self, Rendered};
use crate::sanitize;

/// `GET /`
#[utoipa::path(
    get,
    path = "/",
    tag = "meta",
    responses((status = 200, description = "Service metadata"))
)]
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Lynx OCR gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "docs": "/openapi.json",
        "endpoints": {
            "recognize_upload": "/ocr/recognize",
            "recognize_base64": "/ocr/recognize/base64",
            "get_options": "/ocr/options",
            "health": "/health",
        }
    }))
}

/// `GET /health`
///
/// Probes the default backend's capability endpoint; 503 when it cannot be
/// reached.
#[utoipa::path(
    get,
    path = "/health",
    tag = "meta",
    responses(
        (status = 200, description = "Default backend reachable"),
        (status = 503, description = "Default backend unreachable"),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Response {
    match state.gateway.describe(None).await {
        Ok(_) => Json(json!({
            "status": "healthy",
            "backend": state.gateway.default_engine().to_string(),
            "embedded_available": state.gateway.embedded_available(),
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "backend health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "backend": state.gateway.default_engine().to_string(),
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// `GET /ocr/options`
///
/// Capability metadata from the default backend. Discovery only.
#[utoipa::path(
    get,
    path = "/ocr/options",
    tag = "ocr",
    responses(
        (status = 200, description = "Backend capability metadata"),
        (status = 502, description = "Backend failed to answer"),
    )
)]
pub async fn get_options(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let options = state.gateway.describe(None).await?;
    Ok(Json(json!({
        "message": "OCR options fetched",
        "options": options,
    })))
}

/// `POST /ocr/recognize/base64`
#[utoipa::path(
    post,
    path = "/ocr/recognize/base64",
    tag = "ocr",
    request_body = OcrRequest,
    responses(
        (status = 200, description = "Canonical OCR result, or its plain-text projection when data.format=text", body = OcrResponse),
        (status = 400, description = "Payload failed sanitization"),
    )
)]
pub async fn recognize_base64(
    State(state): State<AppState>,
    Json(request): Json<OcrRequest>,
) -> Result<Response> {
    let image = sanitize::sanitize_base64(&request.base64, &state.config.limits)?;
    let options = request.options.as_ref();

    let response = state.gateway.recognize(&image, options).await?;
    tracing::info!(code = response.code.code(), "base64 recognition complete");

    let format = options.map(OcrOptions::output_format).unwrap_or_default();
    Ok(respond(render::render(&response, format)))
}

/// `POST /ocr/recognize`
///
/// Multipart upload: a `file` field plus the optional dotted-key option
/// fields of the wire protocol.
#[utoipa::path(
    post,
    path = "/ocr/recognize",
    tag = "ocr",
    request_body(content_type = "multipart/form-data", content = String, description = "Image file with optional ocr.*, tbpu.* and data.format fields"),
    responses(
        (status = 200, description = "Upload recognized", body = ImageUploadResponse),
        (status = 400, description = "Missing or invalid file"),
        (status = 413, description = "File exceeds the payload ceiling"),
        (status = 415, description = "Unsupported image format"),
    )
)]
pub async fn recognize_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut file_content_type: Option<String> = None;
    let mut options = OcrOptions::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                if let Some(n) = field.file_name() {
                    file_name = Some(n.to_string());
                }
                if let Some(ct) = field.content_type() {
                    file_content_type = Some(ct.to_string());
                }

                let bytes = field.bytes().await.map_err(|e| {
                    GatewayError::Validation(format!("Failed to read uploaded file: {e}"))
                })?;
                if bytes.is_empty() {
                    return Err(GatewayError::Validation(
                        "uploaded file is empty".to_string(),
                    ));
                }
                file_bytes = Some(bytes.to_vec());
            }
            "ocr.engine" => {
                options.engine = Some(read_text(field).await?.parse().unwrap_or_default());
            }
            "ocr.language" => {
                options.language = Some(read_text(field).await?);
            }
            "ocr.cls" => {
                options.correct_orientation = parse_form_bool(&read_text(field).await?);
            }
            "ocr.limit_side_len" => {
                options.limit_side_len = read_text(field).await?.trim().parse().ok();
            }
            "tbpu.parser" => {
                options.parser = Some(read_text(field).await?);
            }
            "data.format" => {
                options.format = Some(OutputFormat::parse_lenient(&read_text(field).await?));
            }
            other => {
                tracing::debug!(field = %other, "ignoring unknown form field");
            }
        }
    }

    let bytes = file_bytes
        .ok_or_else(|| GatewayError::Validation("missing 'file' form field".to_string()))?;
    let image = sanitize::sanitize_bytes(bytes, file_content_type.as_deref(), &state.config.limits)?;

    let response = state.gateway.recognize(&image, Some(&options)).await?;
    tracing::info!(
        file = file_name.as_deref().unwrap_or("<unnamed>"),
        code = response.code.code(),
        "upload recognition complete"
    );

    match render::render(&response, options.output_format()) {
        Rendered::Text(text) => Ok(text_response(text)),
        Rendered::Structured(result) => Ok(Json(ImageUploadResponse {
            message: "image recognized".to_string(),
            ocr_result: Some(result),
        })
        .into_response()),
    }
}

fn respond(rendered: Rendered) -> Response {
    match rendered {
        Rendered::Structured(response) => Json(response).into_response(),
        Rendered::Text(text) => text_response(text),
    }
}

fn text_response(text: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    )
        .into_response()
}

async fn read_text(field: Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| GatewayError::Validation(format!("Invalid form field: {e}")))
}

fn parse_form_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
