//! Adapter for the remote Umi-OCR-style HTTP backend.
//!
//! One POST per recognition: `{"base64": ..., "options": {...}}` against
//! the configured endpoint, expecting the `{code, data, time, timestamp}`
//! envelope back. No retries here; retry policy belongs to callers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::backend::{BackendParams, Capabilities, OcrEngine, RawOcrOutcome};
use crate::config::RemoteConfig;
use crate::error::{GatewayError, Result};
use crate::sanitize::SanitizedImage;

#[derive(Debug, Clone)]
pub struct RemoteOcrClient {
    client: Client,
    endpoint: String,
    timeout_secs: u64,
}

impl RemoteOcrClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// The capability endpoint sits next to the recognition endpoint.
    fn options_endpoint(&self) -> String {
        format!("{}/get_options", self.endpoint)
    }

    fn classify(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout {
                secs: self.timeout_secs,
            }
        } else if e.is_connect() {
            GatewayError::Unreachable(e.to_string())
        } else {
            GatewayError::Http(e)
        }
    }
}

#[async_trait]
impl OcrEngine for RemoteOcrClient {
    async fn recognize(
        &self,
        image: &SanitizedImage,
        params: &BackendParams,
    ) -> Result<RawOcrOutcome> {
        let options = match params {
            BackendParams::Remote(map) => map.clone(),
            BackendParams::Embedded(_) => {
                return Err(GatewayError::Internal(
                    "embedded params handed to the remote adapter".to_string(),
                ))
            }
        };

        let body = json!({
            "base64": image.to_base64(),
            "options": options,
        });

        tracing::debug!(
            endpoint = %self.endpoint,
            payload_bytes = image.bytes.len(),
            "calling remote OCR backend"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "remote OCR backend returned an error status");
            return Err(GatewayError::Backend {
                code: status.as_u16() as i64,
                message: if text.is_empty() {
                    status.to_string()
                } else {
                    text
                },
            });
        }

        response
            .json::<RawOcrOutcome>()
            .await
            .map_err(|e| GatewayError::Backend {
                code: status.as_u16() as i64,
                message: format!("malformed response body: {e}"),
            })
    }

    async fn describe(&self) -> Result<Capabilities> {
        let response = self
            .client
            .get(self.options_endpoint())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Backend {
                code: status.as_u16() as i64,
                message: status.to_string(),
            });
        }

        response
            .json::<Capabilities>()
            .await
            .map_err(|e| GatewayError::Backend {
                code: status.as_u16() as i64,
                message: format!("malformed options body: {e}"),
            })
    }
}
