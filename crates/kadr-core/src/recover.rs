//! Resilient JSON object recovery from decoded metadata text.
//!
//! Firmware appends one JSON block per exposure, usually without separators
//! or a wrapping array, and sometimes truncated. Recovery is layered:
//!
//! 1. Parse the whole text as a single JSON value (array → elements,
//!    object → one-element sequence)
//! 2. On failure, scan brace depth and parse each balanced run
//!    ([`scan_braces`])
//! 3. If the scan recovers nothing and the text contains a `}{` seam,
//!    split on the seam and re-affix the missing braces ([`repair_seams`])
//!
//! Unparseable fragments are logged and dropped, never escalated: partial
//! recovery is preferred over total failure. Emission order follows the
//! order of appearance in the text; the caller treats the last survivor as
//! the authoritative block, since devices append the final, most complete
//! record last.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Error;

/// A JSON object as recovered from the metadata text
pub type JsonObject = Map<String, Value>;

/// Splits `text` into the ordered sequence of JSON objects it contains
///
/// Every element of the result is a successfully parsed object; fragments
/// that fail to parse and top-level values that are not objects are dropped
/// with a warning. An empty result is not an error at this layer.
pub fn split_objects(text: &str) -> Vec<JsonObject> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return collect_objects(value);
    }

    let recovered = scan_braces(text);
    if !recovered.is_empty() {
        return recovered;
    }

    // Brace counting cannot recover a stream whose leading object lost its
    // opening brace; the seam split still can.
    if text.contains("}{") {
        return repair_seams(text);
    }

    Vec::new()
}

/// Flattens a whole-text parse result into the object sequence
fn collect_objects(value: Value) -> Vec<JsonObject> {
    match value {
        Value::Object(map) => vec![map],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                other => {
                    warn!("dropping non-object array element: {}", other);
                    None
                }
            })
            .collect(),
        other => {
            warn!("top-level metadata value is not an object or array: {}", other);
            Vec::new()
        }
    }
}

/// Recovers objects by brace-depth scanning
///
/// Characters accumulate into a buffer; depth rises on `{` and falls on `}`.
/// Whenever depth returns to zero after having been positive, the buffer
/// accumulated since the last successful split is parsed. A buffer that
/// fails to parse is discarded in full and never retried against later
/// characters, so one stray byte inside an object drops that object.
/// Depth is not tracked through string literals; a brace inside a JSON
/// string skews the count.
pub fn scan_braces(text: &str) -> Vec<JsonObject> {
    let mut objects = Vec::new();
    let mut buffer = String::new();
    let mut buffer_start = 0;
    let mut depth = 0usize;

    for (offset, ch) in text.char_indices() {
        if buffer.is_empty() {
            buffer_start = offset;
        }
        buffer.push(ch);

        match ch {
            '{' => depth += 1,
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    match serde_json::from_str::<Value>(buffer.trim()) {
                        Ok(Value::Object(map)) => objects.push(map),
                        Ok(other) => {
                            warn!("dropping non-object fragment: {}", other)
                        }
                        Err(source) => {
                            let dropped = Error::json_recovery(buffer_start, source);
                            warn!("dropping fragment: {}", dropped);
                        }
                    }
                    buffer.clear();
                }
            }
            _ => {}
        }
    }

    debug!("brace scan recovered {} objects", objects.len());
    objects
}

/// Recovers directly concatenated objects by splitting on the `}{` seam
///
/// Each piece gets its missing outer brace re-affixed before parsing. This
/// handles streams whose objects were glued together with no separator even
/// when the leading brace of the first object was lost, which defeats the
/// depth scan. The repair only re-affixes a brace at an end that has none,
/// so a nested piece whose interior `}}` straddled the seam stays
/// unbalanced and is dropped.
pub fn repair_seams(text: &str) -> Vec<JsonObject> {
    let mut objects = Vec::new();

    for piece in text.split("}{") {
        let mut candidate = piece.to_owned();
        if !candidate.starts_with('{') {
            candidate.insert(0, '{');
        }
        if !candidate.ends_with('}') {
            candidate.push('}');
        }

        match serde_json::from_str::<Value>(&candidate) {
            Ok(Value::Object(map)) => objects.push(map),
            Ok(other) => warn!("dropping non-object piece: {}", other),
            Err(source) => {
                let dropped = Error::json_recovery(0, source);
                warn!("dropping seam piece: {}", dropped);
            }
        }
    }

    debug!("seam repair recovered {} objects", objects.len());
    objects
}
