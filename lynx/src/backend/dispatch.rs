//! Backend dispatcher: maps the engine selector to an adapter and runs the
//! recognize pipeline shared by every boundary route.
//!
//! Adapters are registered once at construction; the gateway holds no
//! per-request state. Adding a backend means a new [`EngineKind`] variant
//! and a new arm in the exhaustive matches below, so the compiler finds
//! every site.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::backend::params;
use crate::backend::{Capabilities, EmbeddedOcrEngine, OcrEngine, RemoteOcrClient};
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::models::{EngineKind, OcrOptions, OcrResponse};
use crate::normalize;
use crate::sanitize::SanitizedImage;

pub struct OcrGateway {
    remote: RemoteOcrClient,
    embedded: Option<EmbeddedOcrEngine>,
    default_engine: EngineKind,
    remote_timeout: Duration,
    embedded_timeout: Duration,
}

impl OcrGateway {
    pub fn new(
        remote: RemoteOcrClient,
        embedded: Option<EmbeddedOcrEngine>,
        config: &Config,
    ) -> Self {
        Self {
            remote,
            embedded,
            default_engine: config.default_engine,
            remote_timeout: Duration::from_secs(config.remote.timeout_secs),
            embedded_timeout: Duration::from_secs(config.embedded.timeout_secs),
        }
    }

    pub fn default_engine(&self) -> EngineKind {
        self.default_engine
    }

    pub fn embedded_available(&self) -> bool {
        self.embedded.is_some()
    }

    /// Resolves a request's selector to the backend that will serve it.
    /// An unset or `default` selector falls back to the configured default
    /// backend; unknown selector strings were already absorbed into
    /// `Default` at deserialization. Never an error at this layer.
    pub fn resolve(&self, requested: Option<EngineKind>) -> EngineKind {
        match requested {
            Some(EngineKind::Embedded) => EngineKind::Embedded,
            Some(EngineKind::Default) | None => self.default_engine,
        }
    }

    fn engine_for(&self, kind: EngineKind) -> Result<&dyn OcrEngine> {
        match kind {
            EngineKind::Default => Ok(&self.remote),
            EngineKind::Embedded => self
                .embedded
                .as_ref()
                .map(|engine| engine as &dyn OcrEngine)
                .ok_or_else(|| {
                    GatewayError::EngineUnavailable(
                        "embedded engine is not configured".to_string(),
                    )
                }),
        }
    }

    fn timeout_for(&self, kind: EngineKind) -> Duration {
        match kind {
            EngineKind::Default => self.remote_timeout,
            EngineKind::Embedded => self.embedded_timeout,
        }
    }

    /// Runs the full recognition pipeline for a sanitized image.
    ///
    /// Adapter failures (timeout, unreachable, backend error) are folded
    /// into a canonical `Failure` envelope so a single bad call can never
    /// escalate past its own request; only an unconfigured engine is
    /// reported as a typed error. Dropping the returned future cancels the
    /// in-flight backend call.
    pub async fn recognize(
        &self,
        image: &SanitizedImage,
        options: Option<&OcrOptions>,
    ) -> Result<OcrResponse> {
        let kind = self.resolve(options.and_then(|o| o.engine));
        let engine = self.engine_for(kind)?;
        let backend_params = params::for_backend(options, kind);
        let deadline = self.timeout_for(kind);

        let started = Instant::now();
        let timestamp = epoch_seconds();

        tracing::info!(
            backend = %kind,
            payload_bytes = image.bytes.len(),
            "dispatching OCR request"
        );

        let raw = match tokio::time::timeout(deadline, engine.recognize(image, &backend_params))
            .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::error!(backend = %kind, error = %e, "backend call failed");
                return Ok(OcrResponse::failure(
                    e.to_string(),
                    started.elapsed().as_secs_f64(),
                    timestamp,
                ));
            }
            Err(_) => {
                let e = GatewayError::Timeout {
                    secs: deadline.as_secs(),
                };
                tracing::error!(backend = %kind, error = %e, "backend call timed out");
                return Ok(OcrResponse::failure(
                    e.to_string(),
                    started.elapsed().as_secs_f64(),
                    timestamp,
                ));
            }
        };

        let response = normalize::normalize_outcome(kind, raw);
        tracing::debug!(
            backend = %kind,
            code = response.code.code(),
            blocks = response.data.block_count(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "recognition normalized"
        );
        Ok(response)
    }

    /// Capability introspection for the selected backend.
    pub async fn describe(&self, requested: Option<EngineKind>) -> Result<Capabilities> {
        let kind = self.resolve(requested);
        let engine = self.engine_for(kind)?;
        engine.describe().await
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
