use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid image encoding: {0}")]
    InvalidEncoding(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Payload too large: {size} bytes (limit {limit} bytes)")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Backend call timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Backend error {code}: {message}")]
    Backend { code: i64, message: String },

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GatewayError::InvalidEncoding(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            GatewayError::UnsupportedFormat(msg) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg.clone())
            }
            GatewayError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, self.to_string())
            }
            GatewayError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            GatewayError::Unreachable(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            GatewayError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            GatewayError::Backend { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            GatewayError::EngineUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            GatewayError::EngineInit(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            GatewayError::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            GatewayError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            GatewayError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitizer_errors_map_to_client_statuses() {
        let cases = [
            (
                GatewayError::InvalidEncoding("bad base64".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::UnsupportedFormat("image/gif".to_string()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                GatewayError::PayloadTooLarge {
                    size: 52_428_800,
                    limit: 10_485_760,
                },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_backend_errors_map_to_gateway_statuses() {
        let timeout = GatewayError::Timeout { secs: 60 }.into_response();
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);

        let unreachable =
            GatewayError::Unreachable("connection refused".to_string()).into_response();
        assert_eq!(unreachable.status(), StatusCode::BAD_GATEWAY);

        let backend = GatewayError::Backend {
            code: 902,
            message: "no image data".to_string(),
        }
        .into_response();
        assert_eq!(backend.status(), StatusCode::BAD_GATEWAY);

        let unavailable =
            GatewayError::EngineUnavailable("embedded engine disabled".to_string()).into_response();
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_error_messages_carry_diagnostic_context() {
        let err = GatewayError::PayloadTooLarge {
            size: 11,
            limit: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("11"), "message should include size: {msg}");
        assert!(msg.contains("10"), "message should include limit: {msg}");

        let err = GatewayError::Backend {
            code: 901,
            message: "empty result".to_string(),
        };
        assert!(err.to_string().contains("901"));
    }
}
