//! Recovery parser for language model output
//!
//! Models are asked for a bare JSON array but routinely wrap it in a code
//! fence, nest it under an object key, surround it with prose or run out of
//! output tokens halfway through. Parsing escalates through these stages:
//!
//! 1. strip a fenced code block
//! 2. strict parse of the whole body
//! 3. parse the first balanced `[...]` span
//! 4. salvage every complete top-level `{...}` object
//!
//! Only when every stage comes up empty is the response rejected.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Object keys that may hold the record array, in precedence order
const WRAPPER_KEYS: [&str; 3] = ["leaders", "assets", "data"];

/// Number of characters of the raw response kept in error messages
const PREVIEW_CHARS: usize = 150;

/// A model response that could not be turned into any records
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to parse model response: {reason} (response started with: {preview:?})")]
pub struct ParseError {
    pub reason: String,
    pub preview: String,
}

impl ParseError {
    fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            preview: raw.chars().take(PREVIEW_CHARS).collect(),
        }
    }
}

/// Parses a model response into a list of JSON values
///
/// `key` is the collection name the caller expects (`leaders` or `assets`)
/// and is consulted after the well-known wrapper keys. A valid but empty
/// array is a successful parse with no records.
pub fn parse_records(text: &str, key: &str) -> Result<Vec<Value>, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::new("empty response", text));
    }

    let body = strip_code_fence(trimmed);

    let strict_error = match serde_json::from_str::<Value>(body) {
        Ok(value) => return Ok(records_from_value(value, key)),
        Err(e) => e,
    };

    if let Some(span) = first_balanced_array(body) {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(span) {
            debug!("Recovered {} record(s) from embedded array", items.len());
            return Ok(items);
        }
    }

    let salvaged = salvage_objects(body);
    if !salvaged.is_empty() {
        warn!(
            "Model response was not valid JSON ({}), salvaged {} complete object(s)",
            strict_error,
            salvaged.len()
        );
        return Ok(salvaged);
    }

    Err(ParseError::new(strict_error.to_string(), text))
}

/// Pulls the record array out of a strictly parsed value
fn records_from_value(value: Value, key: &str) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut object) => WRAPPER_KEYS
            .iter()
            .copied()
            .chain(std::iter::once(key))
            .find_map(|k| match object.remove(k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Returns the contents of the first fenced code block, or the input unchanged
///
/// An optional language tag after the opening fence is skipped. An opening
/// fence with no closing fence (truncated output) yields everything after it.
fn strip_code_fence(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };

    let after_fence = &text[open + 3..];
    let tag_len = after_fence
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(after_fence.len());
    let inner = &after_fence[tag_len..];

    match inner.find("```") {
        Some(close) => inner[..close].trim(),
        None => inner.trim(),
    }
}

/// Finds the first `[` and the `]` that closes it, ignoring brackets inside strings
fn first_balanced_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut scanner = Scanner::default();

    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match scanner.step(*byte) {
            Some(b'[') => scanner.depth += 1,
            Some(b']') => {
                scanner.depth -= 1;
                if scanner.depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Collects every complete top-level object that parses on its own
///
/// Each `{` seen outside an object starts a candidate. Objects that never
/// close are the truncated tail and end the scan.
fn salvage_objects(text: &str) -> Vec<Value> {
    let bytes = text.as_bytes();
    let mut objects = Vec::new();
    let mut position = 0;

    while let Some(relative) = bytes[position..].iter().position(|b| *b == b'{') {
        let start = position + relative;
        let Some(end) = matching_brace(&bytes[start..]).map(|len| start + len) else {
            break;
        };

        match serde_json::from_str::<Value>(&text[start..=end]) {
            Ok(value @ Value::Object(_)) => objects.push(value),
            _ => debug!("Discarding malformed object at offset {}", start),
        }
        position = end + 1;
    }

    objects
}

/// Returns the offset of the `}` closing the object that opens at `bytes[0]`
fn matching_brace(bytes: &[u8]) -> Option<usize> {
    let mut scanner = Scanner::default();

    for (offset, byte) in bytes.iter().enumerate() {
        match scanner.step(*byte) {
            Some(b'{') => scanner.depth += 1,
            Some(b'}') => {
                scanner.depth -= 1;
                if scanner.depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }

    None
}

/// Tracks string and escape state while walking JSON-ish bytes
///
/// Structural characters are all ASCII, and UTF-8 continuation bytes never
/// collide with ASCII, so a byte walk is safe on any `str`.
#[derive(Default)]
struct Scanner {
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl Scanner {
    /// Feeds one byte, returning it only if it is structural (outside a string)
    fn step(&mut self, byte: u8) -> Option<u8> {
        if self.escaped {
            self.escaped = false;
            return None;
        }
        if self.in_string {
            match byte {
                b'\\' => self.escaped = true,
                b'"' => self.in_string = false,
                _ => {}
            }
            return None;
        }
        if byte == b'"' {
            self.in_string = true;
            return None;
        }
        Some(byte)
    }
}
