//! Scrubbing of contract text from values before they reach the logs.

use serde_json::{Map, Value};

const REDACTED_FIELDS: &[&str] = &[
    "content",
    "text",
    "original",
    "suggested",
    "blocks",
    "findings",
    "generalSuggestions",
    "actions",
    "justification",
    "argument",
    "debateNotes",
];

const PREVIEW_LIMIT: usize = 500;

/// Replace document-bearing fields with markers. Arrays collapse to a
/// single marker since their elements are usually document fragments.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Array(_) => Value::String("[REDACTED_ARRAY]".into()),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, v) in map {
                let redacted = if REDACTED_FIELDS.contains(&key.as_str()) {
                    Value::String("[REDACTED]".into())
                } else {
                    redact(v)
                };
                out.insert(key.clone(), redacted);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Redacted, length-capped rendering for debug logs
pub fn preview(value: &Value) -> String {
    let rendered = redact(value).to_string();
    if rendered.chars().count() <= PREVIEW_LIMIT {
        rendered
    } else {
        let cut: String = rendered.chars().take(PREVIEW_LIMIT).collect();
        format!("{}...", cut)
    }
}
