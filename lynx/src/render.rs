//! Output format negotiation: a pure projection of the canonical result.
//!
//! Rendering never alters the stored response; it only decides what the
//! caller receives.

use crate::models::{OcrPayload, OcrResponse, OcrTextBlock, OutputFormat};

/// What the boundary should send back: the canonical envelope, or its
/// plain-text projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Structured(OcrResponse),
    Text(String),
}

/// Renders `response` in the requested format.
///
/// `text` applies only to successful results; failures keep the structured
/// envelope so the error string is never flattened away.
pub fn render(response: &OcrResponse, format: OutputFormat) -> Rendered {
    match format {
        OutputFormat::Structured => Rendered::Structured(response.clone()),
        OutputFormat::Text => {
            if !response.code.is_success() {
                return Rendered::Structured(response.clone());
            }
            match &response.data {
                OcrPayload::Text(s) => Rendered::Text(s.clone()),
                OcrPayload::Blocks(blocks) => Rendered::Text(concat_blocks(blocks)),
            }
        }
    }
}

/// `text + end` for every block, in original detection order. No sorting,
/// no deduplication, no trimming beyond what the terminators encode.
fn concat_blocks(blocks: &[OcrTextBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        out.push_str(&block.text);
        out.push_str(&block.end);
    }
    out
}
