//! Tolerant decoding of model output.
//!
//! Two stages: pick a candidate JSON substring (fenced block first, then the
//! whole text, then the outermost bracketed span), then decode it strictly
//! into the expected type.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use compete_shared::{CompeteError, Result};

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("valid fence regex"));

/// The substring of `text` most likely to hold the JSON payload.
pub fn json_candidate(text: &str) -> &str {
    FENCED_BLOCK
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or_else(|| text.trim())
}

/// Outermost `{...}` or `[...]` span, whichever opens first.
fn bracketed_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (start < end).then(|| &text[start..=end])
}

/// Decode model output into `T`.
///
/// Fails with [`CompeteError::Parse`] carrying a snippet of `text` when no
/// candidate parses as JSON, or when the JSON does not have `T`'s shape.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    let candidate = json_candidate(text);

    let value: serde_json::Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(first_err) => bracketed_span(candidate)
            .and_then(|span| serde_json::from_str(span).ok())
            .ok_or_else(|| {
                CompeteError::parse(format!("response is not valid JSON: {first_err}"), text)
            })?,
    };

    serde_json::from_value(value).map_err(|e| {
        CompeteError::parse(format!("response does not match the expected shape: {e}"), text)
    })
}
