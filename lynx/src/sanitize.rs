//! Validates and normalizes raw image payloads before they reach a backend.
//!
//! Accepts raw bytes or a base64 string that may carry a
//! `data:<mime>;base64,` prefix. Nothing here mutates the caller's input;
//! failures are typed and reported before any backend call is made.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::config::LimitsConfig;
use crate::error::{GatewayError, Result};

/// Raster formats accepted by every backend.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/bmp",
    "image/tiff",
    "image/webp",
];

/// A validated image payload, ready for dispatch.
#[derive(Debug, Clone)]
pub struct SanitizedImage {
    pub bytes: Vec<u8>,
    /// Sniffed content type, e.g. `image/png`.
    pub mime: String,
}

impl SanitizedImage {
    /// Standard base64 of the payload, the encoding the remote protocol
    /// expects.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Strips any `data:<mime>;base64,` prefix (everything up to and including
/// the first comma) and surrounding whitespace.
pub fn clean_base64(raw: &str) -> &str {
    let stripped = match raw.find(',') {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    };
    stripped.trim()
}

/// Sanitizes a base64 payload: prefix stripping, decoding, format sniffing
/// and the size ceiling.
pub fn sanitize_base64(raw: &str, limits: &LimitsConfig) -> Result<SanitizedImage> {
    let cleaned = clean_base64(raw);
    if cleaned.is_empty() {
        return Err(GatewayError::InvalidEncoding(
            "empty base64 payload".to_string(),
        ));
    }

    let bytes = STANDARD
        .decode(cleaned)
        .map_err(|e| GatewayError::InvalidEncoding(format!("base64 decode failed: {e}")))?;

    sanitize_bytes(bytes, None, limits)
}

/// Sanitizes an already-decoded payload. `declared_type` is the content
/// type the caller claimed (e.g. from a multipart upload); when present it
/// is checked against the allow-list before the bytes are sniffed.
pub fn sanitize_bytes(
    bytes: Vec<u8>,
    declared_type: Option<&str>,
    limits: &LimitsConfig,
) -> Result<SanitizedImage> {
    if bytes.is_empty() {
        return Err(GatewayError::InvalidEncoding(
            "decoded image payload is empty".to_string(),
        ));
    }

    if let Some(declared) = declared_type {
        let normalized = normalize_mime(declared);
        if !ALLOWED_MIME_TYPES.contains(&normalized.as_str()) {
            tracing::warn!(declared_type = %declared, "rejected upload with unsupported content type");
            return Err(GatewayError::UnsupportedFormat(declared.to_string()));
        }
    }

    let mime = match infer::get(&bytes) {
        Some(kind) => kind.mime_type(),
        None => {
            return Err(GatewayError::UnsupportedFormat(
                "unrecognized image data".to_string(),
            ))
        }
    };
    if !ALLOWED_MIME_TYPES.contains(&mime) {
        tracing::warn!(sniffed_type = %mime, size = bytes.len(), "rejected payload with unsupported format");
        return Err(GatewayError::UnsupportedFormat(mime.to_string()));
    }

    if bytes.len() > limits.max_image_bytes {
        tracing::warn!(
            size = bytes.len(),
            limit = limits.max_image_bytes,
            "rejected oversized payload"
        );
        return Err(GatewayError::PayloadTooLarge {
            size: bytes.len(),
            limit: limits.max_image_bytes,
        });
    }

    tracing::debug!(size = bytes.len(), mime = %mime, "image payload sanitized");

    Ok(SanitizedImage {
        bytes,
        mime: mime.to_string(),
    })
}

/// Folds the common `image/jpg` spelling into `image/jpeg`.
fn normalize_mime(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    if lower == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        lower
    }
}
