//! Converts raw, version-drifting backend results into the canonical
//! [`OcrResponse`].
//!
//! Raw element shapes differ between backends and drift across engine
//! versions, so every logical attribute is extracted through an ordered
//! fallback chain over a fixed list of candidate field names. Elements
//! that yield no text under any candidate are dropped (and logged);
//! structurally broken elements are replaced by one synthetic
//! zero-confidence block. Partial results beat total failure.

use serde_json::{Map, Value};
use tracing::warn;

use crate::backend::RawOcrOutcome;
use crate::models::{EngineKind, OcrPayload, OcrResponse, OcrStatus, OcrTextBlock};

/// Candidate field names for the recognized text, tried in order.
const TEXT_FIELDS: &[&str] = &["text", "rec_text"];
/// Legacy shape: one element carrying a whole array of recognized strings.
const LEGACY_TEXT_LIST_FIELD: &str = "rec_texts";
const SCORE_FIELDS: &[&str] = &["score", "rec_score"];
const BOX_FIELDS: &[&str] = &["box", "bbox"];
const END_FIELD: &str = "end";

const DEFAULT_SCORE: f64 = 1.0;
const DEFAULT_END: &str = " ";

/// Normalizes one adapter outcome into the canonical response. Never
/// fails: broken input degrades to dropped elements, synthetic blocks or a
/// failure envelope, all logged with the backend id.
pub fn normalize_outcome(engine: EngineKind, raw: RawOcrOutcome) -> OcrResponse {
    let code = OcrStatus::from_code(raw.code);

    let data = match raw.data {
        // Plain text or an error message: pass through unchanged.
        Value::String(s) => OcrPayload::Text(s),
        Value::Array(elements) => OcrPayload::Blocks(elements_to_blocks(engine, &elements)),
        Value::Null => OcrPayload::Text(String::new()),
        other => {
            warn!(backend = %engine, "unexpected raw payload type, stringifying");
            OcrPayload::Text(other.to_string())
        }
    };

    if !code.is_success() {
        warn!(
            backend = %engine,
            code = code.code(),
            "backend reported non-success status"
        );
    }

    OcrResponse {
        code,
        data,
        time: raw.time,
        timestamp: raw.timestamp,
    }
}

enum ElementOutcome {
    Blocks(Vec<OcrTextBlock>),
    /// No text under any candidate field.
    Empty,
    /// Structurally broken in a way the chains cannot absorb.
    Broken(String),
}

fn elements_to_blocks(engine: EngineKind, elements: &[Value]) -> Vec<OcrTextBlock> {
    let mut blocks = Vec::with_capacity(elements.len());

    for (index, element) in elements.iter().enumerate() {
        let Some(obj) = element.as_object() else {
            warn!(backend = %engine, index, "skipping non-object raw element");
            continue;
        };

        match element_to_blocks(obj) {
            ElementOutcome::Blocks(mut converted) => blocks.append(&mut converted),
            ElementOutcome::Empty => {
                warn!(backend = %engine, index, "dropping raw element with no text field");
            }
            ElementOutcome::Broken(message) => {
                warn!(backend = %engine, index, error = %message, "raw element failed to process");
                blocks.push(OcrTextBlock {
                    text: format!("failed to process raw element: {message}"),
                    score: 0.0,
                    box_points: Vec::new(),
                    end: String::new(),
                });
            }
        }
    }

    blocks
}

fn element_to_blocks(obj: &Map<String, Value>) -> ElementOutcome {
    match first_field(obj, TEXT_FIELDS) {
        Some(Value::String(text)) => ElementOutcome::Blocks(vec![OcrTextBlock {
            text: text.clone(),
            score: extract_score(obj),
            box_points: extract_box(obj),
            end: extract_end(obj),
        }]),
        Some(other) => ElementOutcome::Broken(format!("text field has non-string value: {other}")),
        None => match obj.get(LEGACY_TEXT_LIST_FIELD) {
            Some(Value::Array(texts)) => {
                let blocks: Vec<OcrTextBlock> = texts
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .map(|t| OcrTextBlock {
                        text: t.to_string(),
                        score: DEFAULT_SCORE,
                        box_points: Vec::new(),
                        end: DEFAULT_END.to_string(),
                    })
                    .collect();
                if blocks.is_empty() {
                    ElementOutcome::Empty
                } else {
                    ElementOutcome::Blocks(blocks)
                }
            }
            Some(other) => {
                ElementOutcome::Broken(format!("legacy text list has non-array value: {other}"))
            }
            None => ElementOutcome::Empty,
        },
    }
}

fn first_field<'a>(obj: &'a Map<String, Value>, candidates: &[&str]) -> Option<&'a Value> {
    candidates.iter().find_map(|name| obj.get(*name))
}

fn extract_score(obj: &Map<String, Value>) -> f64 {
    first_field(obj, SCORE_FIELDS)
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_SCORE)
}

fn extract_box(obj: &Map<String, Value>) -> Vec<[i64; 2]> {
    first_field(obj, BOX_FIELDS)
        .map(parse_points)
        .unwrap_or_default()
}

/// Parses `[[x, y], ...]`, tolerating float coordinates. Anything that is
/// not a point pair is dropped rather than failing the element.
fn parse_points(value: &Value) -> Vec<[i64; 2]> {
    let Some(points) = value.as_array() else {
        return Vec::new();
    };

    points
        .iter()
        .filter_map(|point| {
            let pair = point.as_array()?;
            let x = pair.first()?.as_f64()?;
            let y = pair.get(1)?.as_f64()?;
            Some([x as i64, y as i64])
        })
        .collect()
}

fn extract_end(obj: &Map<String, Value>) -> String {
    obj.get(END_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_END.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn outcome(code: i64, data: Value) -> RawOcrOutcome {
        RawOcrOutcome {
            code,
            data,
            time: 0.25,
            timestamp: 1_700_000_000.0,
        }
    }

    #[test]
    fn test_remote_shaped_elements_normalize_in_order() {
        let raw = outcome(
            100,
            json!([
                {"text": "first", "score": 0.91, "box": [[0,0],[10,0],[10,10],[0,10]], "end": " "},
                {"text": "second", "score": 0.88, "box": [], "end": "\n"},
            ]),
        );

        let response = normalize_outcome(EngineKind::Default, raw);
        assert_eq!(response.code, OcrStatus::Success);
        let OcrPayload::Blocks(blocks) = &response.data else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "first");
        assert_eq!(blocks[0].box_points, vec![[0, 0], [10, 0], [10, 10], [0, 10]]);
        assert_eq!(blocks[1].text, "second");
        assert_eq!(blocks[1].end, "\n");
    }

    #[test]
    fn test_secondary_text_field_is_used_when_primary_missing() {
        let raw = outcome(100, json!([{"rec_text": "embedded line", "rec_score": 0.8}]));

        let response = normalize_outcome(EngineKind::Embedded, raw);
        let OcrPayload::Blocks(blocks) = &response.data else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "embedded line");
        assert_eq!(blocks[0].score, 0.8);
    }

    #[test]
    fn test_legacy_text_list_expands_with_default_confidence() {
        let raw = outcome(100, json!([{"rec_texts": ["only legacy"]}]));

        let response = normalize_outcome(EngineKind::Embedded, raw);
        let OcrPayload::Blocks(blocks) = &response.data else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "only legacy");
        assert_eq!(blocks[0].score, 1.0, "missing confidence defaults to 1.0");
        assert!(blocks[0].box_points.is_empty());
    }

    #[test]
    fn test_legacy_text_list_skips_empty_entries() {
        let raw = outcome(100, json!([{"rec_texts": ["a", "", "b"]}]));

        let response = normalize_outcome(EngineKind::Embedded, raw);
        let OcrPayload::Blocks(blocks) = &response.data else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "a");
        assert_eq!(blocks[1].text, "b");
    }

    #[test]
    fn test_missing_confidence_and_box_get_defaults_never_null() {
        let raw = outcome(100, json!([{"text": "bare"}]));

        let response = normalize_outcome(EngineKind::Default, raw);
        let OcrPayload::Blocks(blocks) = &response.data else {
            panic!("expected blocks");
        };
        assert_eq!(blocks[0].score, 1.0);
        assert!(blocks[0].box_points.is_empty());
        assert_eq!(blocks[0].end, " ");

        // The canonical model serializes concrete values, never null.
        let serialized = serde_json::to_value(&blocks[0]).unwrap();
        assert_eq!(serialized["score"], json!(1.0));
        assert_eq!(serialized["box"], json!([]));
    }

    #[test]
    fn test_textless_elements_are_dropped_not_fatal() {
        let raw = outcome(
            100,
            json!([
                {"text": "kept"},
                {"confidence": 0.5},
                {"text": "also kept"},
            ]),
        );

        let response = normalize_outcome(EngineKind::Default, raw);
        let OcrPayload::Blocks(blocks) = &response.data else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "kept");
        assert_eq!(blocks[1].text, "also kept");
        assert_eq!(response.code, OcrStatus::Success);
    }

    #[test]
    fn test_non_object_elements_are_skipped() {
        let raw = outcome(100, json!(["just a string", 42, {"text": "real"}]));

        let response = normalize_outcome(EngineKind::Default, raw);
        assert_eq!(response.data.block_count(), 1);
    }

    #[test]
    fn test_broken_element_yields_synthetic_zero_confidence_block() {
        let raw = outcome(100, json!([{"text": 12345}, {"text": "fine"}]));

        let response = normalize_outcome(EngineKind::Default, raw);
        let OcrPayload::Blocks(blocks) = &response.data else {
            panic!("expected blocks");
        };
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].text.contains("failed to process"));
        assert_eq!(blocks[0].score, 0.0);
        assert_eq!(blocks[1].text, "fine");
    }

    #[test]
    fn test_string_payload_passes_through_unchanged() {
        let raw = outcome(200, json!("[Error] no text found"));

        let response = normalize_outcome(EngineKind::Default, raw);
        assert_eq!(response.code, OcrStatus::Failure);
        assert_eq!(
            response.data,
            OcrPayload::Text("[Error] no text found".to_string())
        );
        assert_eq!(response.time, 0.25);
        assert_eq!(response.timestamp, 1_700_000_000.0);
    }

    #[test]
    fn test_backend_specific_codes_pass_through() {
        let raw = outcome(101, json!("no text in image"));
        let response = normalize_outcome(EngineKind::Default, raw);
        assert_eq!(response.code, OcrStatus::Backend(101));
        assert!(!response.code.is_success());
    }

    #[test]
    fn test_null_payload_becomes_empty_string() {
        let raw = outcome(100, Value::Null);
        let response = normalize_outcome(EngineKind::Default, raw);
        assert_eq!(response.data, OcrPayload::Text(String::new()));
    }

    #[test]
    fn test_float_box_coordinates_are_truncated() {
        let raw = outcome(100, json!([{"text": "t", "box": [[1.9, 2.2], [3.0, 4.7]]}]));

        let response = normalize_outcome(EngineKind::Default, raw);
        let OcrPayload::Blocks(blocks) = &response.data else {
            panic!("expected blocks");
        };
        assert_eq!(blocks[0].box_points, vec![[1, 2], [3, 4]]);
    }

    #[test]
    fn test_malformed_box_defaults_to_empty() {
        let raw = outcome(100, json!([{"text": "t", "box": "not points"}]));

        let response = normalize_outcome(EngineKind::Default, raw);
        let OcrPayload::Blocks(blocks) = &response.data else {
            panic!("expected blocks");
        };
        assert!(blocks[0].box_points.is_empty());
    }
}
