//! Options normalizer: maps the canonical options into each backend's
//! parameter shape.
//!
//! Pure and deterministic. Unset canonical fields are omitted, never
//! defaulted, except where a backend requires a value.

use serde_json::{json, Map, Value};

use crate::models::{EngineKind, OcrOptions, OutputFormat};

/// Sentinel forced into `ocr.limit_side_len` for every remote call,
/// regardless of caller input, to bypass the remote engine's internal
/// downscaling cap. Intentionally unconditional; this constant is the
/// place to make it configurable if that ever changes.
pub const FORCED_LIMIT_SIDE_LEN: u32 = 999_999;

/// Parameter set handed to an adapter, shaped for its backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendParams {
    /// Dotted-key map for the remote protocol's `options` object.
    Remote(Map<String, Value>),
    Embedded(EmbeddedParams),
}

/// The embedded engine only honors a language hint; everything else in the
/// canonical options is remote-specific.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedParams {
    pub language: Option<String>,
}

/// Builds the parameter set for `backend` from the canonical options.
pub fn for_backend(options: Option<&OcrOptions>, backend: EngineKind) -> BackendParams {
    match backend {
        EngineKind::Default => BackendParams::Remote(remote_params(options)),
        EngineKind::Embedded => BackendParams::Embedded(embedded_params(options)),
    }
}

fn remote_params(options: Option<&OcrOptions>) -> Map<String, Value> {
    let mut map = Map::new();

    if let Some(opts) = options {
        if let Some(language) = &opts.language {
            map.insert("ocr.language".to_string(), json!(language));
        }
        if let Some(cls) = opts.correct_orientation {
            map.insert("ocr.cls".to_string(), json!(cls));
        }
        if let Some(parser) = &opts.parser {
            map.insert("tbpu.parser".to_string(), json!(parser));
        }
        if let Some(areas) = &opts.ignore_areas {
            map.insert("tbpu.ignoreArea".to_string(), json!(areas));
        }
        if let Some(format) = opts.format {
            map.insert("data.format".to_string(), json!(wire_format(format)));
        }
        // opts.limit_side_len is deliberately not forwarded; the sentinel
        // below wins unconditionally.
    }

    map.insert(
        "ocr.limit_side_len".to_string(),
        json!(FORCED_LIMIT_SIDE_LEN),
    );

    map
}

fn embedded_params(options: Option<&OcrOptions>) -> EmbeddedParams {
    EmbeddedParams {
        language: options.and_then(|opts| opts.language.clone()),
    }
}

/// The remote protocol predates the `structured` name and expects `dict`.
fn wire_format(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Structured => "dict",
        OutputFormat::Text => "text",
    }
}
