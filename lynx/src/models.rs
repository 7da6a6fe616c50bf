//! Canonical request/response model shared by every backend.
//!
//! All adapters normalize into these types; nothing downstream of the
//! dispatcher ever sees a backend-specific shape. Wire field names keep the
//! dotted-key convention of the remote protocol (`ocr.language`,
//! `data.format`, ...) so existing clients keep working.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use utoipa::ToSchema;

/// Engine selector. Unknown selector strings deserialize to [`EngineKind::Default`]
/// so a stale client can never make dispatch fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// The configured default backend (the remote HTTP engine unless
    /// overridden).
    #[default]
    Default,
    /// The locally embedded recognition engine.
    Embedded,
}

impl FromStr for EngineKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "embedded" => EngineKind::Embedded,
            _ => EngineKind::Default,
        })
    }
}

impl<'de> Deserialize<'de> for EngineKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let kind: EngineKind = raw.parse().unwrap_or_default();
        if kind == EngineKind::Default && !raw.trim().eq_ignore_ascii_case("default") {
            tracing::debug!(selector = %raw, "unrecognized engine selector, using default backend");
        }
        Ok(kind)
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::Default => write!(f, "default"),
            EngineKind::Embedded => write!(f, "embedded"),
        }
    }
}

/// Requested rendering of the recognition result.
///
/// `dict` is accepted as a legacy alias for `structured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[serde(alias = "dict")]
    Structured,
    Text,
}

impl OutputFormat {
    /// Lenient parse for form fields: anything that is not `text` keeps the
    /// structured default, mirroring the selector fallback behavior.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "text" => OutputFormat::Text,
            _ => OutputFormat::Structured,
        }
    }
}

/// Recognition options. Every field is optional; absence means "use the
/// backend default". The options normalizer maps these to each backend's
/// parameter shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct OcrOptions {
    #[serde(rename = "ocr.engine", skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineKind>,

    /// Language / model library hint.
    #[serde(rename = "ocr.language", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Correct text orientation before recognition.
    #[serde(rename = "ocr.cls", skip_serializing_if = "Option::is_none")]
    pub correct_orientation: Option<bool>,

    /// Max detection side length hint. The remote backend ignores this and
    /// always receives the forced sentinel instead; see `backend::params`.
    #[serde(rename = "ocr.limit_side_len", skip_serializing_if = "Option::is_none")]
    pub limit_side_len: Option<u32>,

    /// Layout parser selection for the remote backend.
    #[serde(rename = "tbpu.parser", skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,

    /// Regions to exclude from recognition, as polygons of `[x, y]` points.
    #[serde(rename = "tbpu.ignoreArea", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Vec<Vec<Vec<i64>>>)]
    pub ignore_areas: Option<Vec<Vec<[i64; 2]>>>,

    #[serde(rename = "data.format", skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

impl OcrOptions {
    pub fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

/// Inbound recognition request: a base64 payload (with or without a
/// `data:<mime>;base64,` prefix) plus optional options.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OcrRequest {
    pub base64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OcrOptions>,
}

fn default_score() -> f64 {
    1.0
}

fn default_end() -> String {
    " ".to_string()
}

/// One recognized text region, in detection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OcrTextBlock {
    pub text: String,
    /// Confidence in `0.0..=1.0`; `1.0` when the backend reports none.
    #[serde(default = "default_score")]
    pub score: f64,
    /// Bounding polygon as `[x, y]` points; empty when the backend reports
    /// no geometry. Never null.
    #[serde(rename = "box", default)]
    #[schema(value_type = Vec<Vec<i64>>)]
    pub box_points: Vec<[i64; 2]>,
    /// Terminator appended after `text` when rendering plain text.
    #[serde(default = "default_end")]
    pub end: String,
}

/// Canonical status. Serialized as the bare integer code the remote
/// protocol uses: `100` success, `200` failure, anything else passed
/// through from the backend verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrStatus {
    Success,
    Failure,
    Backend(i64),
}

impl OcrStatus {
    pub const SUCCESS_CODE: i64 = 100;
    pub const FAILURE_CODE: i64 = 200;

    pub fn from_code(code: i64) -> Self {
        match code {
            Self::SUCCESS_CODE => OcrStatus::Success,
            Self::FAILURE_CODE => OcrStatus::Failure,
            other => OcrStatus::Backend(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            OcrStatus::Success => Self::SUCCESS_CODE,
            OcrStatus::Failure => Self::FAILURE_CODE,
            OcrStatus::Backend(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, OcrStatus::Success)
    }
}

impl Serialize for OcrStatus {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for OcrStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(Self::from_code)
    }
}

/// Result payload: either an opaque string (plain text or an error
/// message) or the ordered block list. Order is detection order and is
/// never re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OcrPayload {
    Text(String),
    Blocks(Vec<OcrTextBlock>),
}

impl OcrPayload {
    pub fn block_count(&self) -> usize {
        match self {
            OcrPayload::Text(_) => 0,
            OcrPayload::Blocks(blocks) => blocks.len(),
        }
    }
}

/// The backend-independent recognition result every adapter normalizes
/// into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OcrResponse {
    #[schema(value_type = i64)]
    pub code: OcrStatus,
    /// String payload or ordered block list.
    #[schema(value_type = Object)]
    pub data: OcrPayload,
    /// Elapsed seconds.
    pub time: f64,
    /// Epoch-seconds start timestamp.
    pub timestamp: f64,
}

impl OcrResponse {
    pub fn failure(message: impl Into<String>, time: f64, timestamp: f64) -> Self {
        Self {
            code: OcrStatus::Failure,
            data: OcrPayload::Text(message.into()),
            time,
            timestamp,
        }
    }
}

/// Envelope returned by the multipart upload route.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageUploadResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_result: Option<OcrResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unknown_engine_selector_falls_back_to_default() {
        let kind: EngineKind = serde_json::from_str("\"paddleocr\"").unwrap();
        assert_eq!(kind, EngineKind::Default);

        let kind: EngineKind = serde_json::from_str("\"\"").unwrap();
        assert_eq!(kind, EngineKind::Default);
    }

    #[test]
    fn test_known_engine_selectors_roundtrip() {
        let kind: EngineKind = serde_json::from_str("\"embedded\"").unwrap();
        assert_eq!(kind, EngineKind::Embedded);
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"embedded\"");

        let kind: EngineKind = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(kind, EngineKind::Default);
    }

    #[test]
    fn test_output_format_accepts_legacy_dict_alias() {
        let fmt: OutputFormat = serde_json::from_str("\"dict\"").unwrap();
        assert_eq!(fmt, OutputFormat::Structured);

        let fmt: OutputFormat = serde_json::from_str("\"text\"").unwrap();
        assert_eq!(fmt, OutputFormat::Text);

        assert_eq!(
            serde_json::to_string(&OutputFormat::Structured).unwrap(),
            "\"structured\""
        );
    }

    #[test]
    fn test_output_format_lenient_parse_defaults_to_structured() {
        assert_eq!(OutputFormat::parse_lenient("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse_lenient("TEXT"), OutputFormat::Text);
        assert_eq!(
            OutputFormat::parse_lenient("dict"),
            OutputFormat::Structured
        );
        assert_eq!(
            OutputFormat::parse_lenient("garbage"),
            OutputFormat::Structured
        );
    }

    #[test]
    fn test_status_integer_roundtrip() {
        assert_eq!(OcrStatus::from_code(100), OcrStatus::Success);
        assert_eq!(OcrStatus::from_code(200), OcrStatus::Failure);
        assert_eq!(OcrStatus::from_code(101), OcrStatus::Backend(101));

        assert_eq!(serde_json::to_string(&OcrStatus::Success).unwrap(), "100");
        let status: OcrStatus = serde_json::from_str("902").unwrap();
        assert_eq!(status, OcrStatus::Backend(902));
        assert!(!status.is_success());
    }

    #[test]
    fn test_response_deserializes_remote_block_envelope() {
        let raw = r#"{
            "code": 100,
            "data": [
                {"text": "hello", "score": 0.98, "box": [[0,0],[10,0],[10,10],[0,10]], "end": " "},
                {"text": "world", "score": 0.95, "box": [], "end": "\n"}
            ],
            "time": 0.42,
            "timestamp": 1700000000.0
        }"#;

        let response: OcrResponse = serde_json::from_str(raw).unwrap();
        assert!(response.code.is_success());
        match &response.data {
            OcrPayload::Blocks(blocks) => {
                assert_eq!(blocks.len(), 2);
                assert_eq!(blocks[0].text, "hello");
                assert_eq!(blocks[0].box_points.len(), 4);
                assert_eq!(blocks[1].end, "\n");
            }
            OcrPayload::Text(_) => panic!("expected block payload"),
        }
    }

    #[test]
    fn test_response_deserializes_string_envelope() {
        let raw = r#"{"code": 200, "data": "engine exploded", "time": 0.1, "timestamp": 1.0}"#;
        let response: OcrResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.code, OcrStatus::Failure);
        assert_eq!(
            response.data,
            OcrPayload::Text("engine exploded".to_string())
        );
    }

    #[test]
    fn test_block_defaults_fill_missing_fields() {
        let block: OcrTextBlock = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(block.score, 1.0);
        assert!(block.box_points.is_empty());
        assert_eq!(block.end, " ");
    }

    #[test]
    fn test_options_use_dotted_wire_keys() {
        let raw = r#"{
            "ocr.engine": "embedded",
            "ocr.language": "models/config_chinese.txt",
            "ocr.cls": true,
            "tbpu.parser": "multi_para",
            "data.format": "text"
        }"#;

        let options: OcrOptions = serde_json::from_str(raw).unwrap();
        assert_eq!(options.engine, Some(EngineKind::Embedded));
        assert_eq!(options.correct_orientation, Some(true));
        assert_eq!(options.parser.as_deref(), Some("multi_para"));
        assert_eq!(options.output_format(), OutputFormat::Text);

        let json = serde_json::to_value(&options).unwrap();
        assert!(json.get("ocr.language").is_some());
        assert!(json.get("ocr.limit_side_len").is_none(), "unset fields are omitted");
    }
}
