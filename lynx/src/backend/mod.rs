//! Backend contract and the adapters implementing it.
//!
//! Every OCR engine is reachable through [`OcrEngine`]: a `recognize` call
//! bounded by the caller's timeout and a side-effect-free `describe`
//! introspection call. Adapters return the raw engine envelope untouched;
//! interpreting it is the normalizer's job.

pub mod dispatch;
pub mod embedded;
pub mod params;
pub mod remote;

pub use dispatch::OcrGateway;
pub use embedded::EmbeddedOcrEngine;
pub use params::BackendParams;
pub use remote::RemoteOcrClient;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::sanitize::SanitizedImage;

/// Descriptive backend metadata returned by `describe()`. Discovery only;
/// never consulted for correctness.
pub type Capabilities = serde_json::Value;

/// The raw result envelope shared by both backends: an integer status
/// code, a string-or-array payload whose element shapes drift across
/// engine versions, and the engine's own timing figures.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOcrOutcome {
    pub code: i64,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub timestamp: f64,
}

/// Uniform adapter contract. Implementations must surface `Timeout`,
/// `Unreachable` and `Backend` failures distinctly so callers can tell a
/// dead engine from a slow one.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(
        &self,
        image: &SanitizedImage,
        params: &BackendParams,
    ) -> Result<RawOcrOutcome>;

    async fn describe(&self) -> Result<Capabilities>;
}
