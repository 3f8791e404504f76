//! Repair helpers for model-emitted JSON.
//!
//! Local models wrap JSON in markdown fences or surround it with prose
//! often enough that every structured-output caller needs the same
//! cleanup: strip fences, try the text as-is, then fall back to the
//! outermost bracketed span.

use ca_domain::error::{Error, Result};
use serde_json::Value;

/// Remove markdown code fences (``` and ```json) and trim.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let mut out = trimmed.trim_start_matches("```");
    // Language tag on the opening fence ("json\n…").
    if let Some(rest) = out.strip_prefix("json") {
        out = rest;
    }
    let out = out.trim_end_matches("```");
    out.trim().to_string()
}

/// Parse model output expected to contain one JSON object.
///
/// Tries the cleaned text directly, then the outermost `{…}` span.
pub fn parse_json_object(raw: &str) -> Result<Value> {
    parse_with_span(raw, '{', '}')
}

/// Parse model output expected to contain one JSON array.
pub fn parse_json_array(raw: &str) -> Result<Vec<Value>> {
    let value = parse_with_span(raw, '[', ']')?;
    match value {
        Value::Array(items) => Ok(items),
        other => Err(Error::Extraction(format!(
            "expected a JSON array, got {}",
            type_name(&other)
        ))),
    }
}

fn parse_with_span(raw: &str, open: char, close: char) -> Result<Value> {
    let cleaned = strip_code_fences(raw);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    // Outermost span: first opening bracket to last closing bracket. Model
    // prose before/after the JSON body is the common failure, not nesting.
    let start = cleaned.find(open);
    let end = cleaned.rfind(close);
    if let (Some(start), Some(end)) = (start, end) {
        if end > start {
            let span = &cleaned[start..=end];
            if let Ok(value) = serde_json::from_str::<Value>(span) {
                return Ok(value);
            }
        }
    }

    Err(Error::Extraction(format!(
        "no parseable JSON in model output ({} chars)",
        raw.len()
    )))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
