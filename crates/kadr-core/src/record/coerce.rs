//! Result-with-default field coercions.
//!
//! Every field of the output record is derived through one of these
//! functions. None of them can fail: a missing, null, or malformed source
//! value collapses to the field's zero value with the `defaulted` flag set,
//! so the normalizer never needs a catch-all around a single derivation and
//! one bad value never aborts the rest of the record.
//!
//! Stray non-string primitives are stringified on the way through [`text`],
//! which is what keeps the finished record JSON-encodable regardless of
//! what a lookup returned.

use serde_json::Value;

/// A coerced value together with whether the default was substituted
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced<T> {
    /// The derived value
    pub value: T,
    /// True when the source was missing or malformed and the default was used
    pub defaulted: bool,
}

impl<T> Coerced<T> {
    /// Wraps a value derived from actual source data
    pub fn parsed(value: T) -> Self {
        Self {
            value,
            defaulted: false,
        }
    }

    /// Wraps a substituted default
    pub fn fallback(value: T) -> Self {
        Self {
            value,
            defaulted: true,
        }
    }
}

/// Coerces a value to text
///
/// Strings pass through; numbers and booleans are stringified; nested
/// arrays and objects render as compact JSON. Missing or null input yields
/// the empty string.
pub fn text(value: Option<&Value>) -> Coerced<String> {
    match value {
        None | Some(Value::Null) => Coerced::fallback(String::new()),
        Some(Value::String(s)) => Coerced::parsed(s.clone()),
        Some(other) => Coerced::parsed(other.to_string()),
    }
}

/// Coerces a plate-number value: text with internal `|` separators stripped
pub fn plate(value: Option<&Value>) -> Coerced<String> {
    let mut coerced = text(value);
    coerced.value.retain(|c| c != '|');
    coerced
}

/// Coerces a value to a float, scrubbing non-numeric characters from strings
///
/// String input keeps only digits, `.`, and `-` before parsing. Missing,
/// empty-after-scrub, or unparseable input yields 0.0.
pub fn float(value: Option<&Value>) -> Coerced<f64> {
    match value {
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) => Coerced::parsed(f),
            None => Coerced::fallback(0.0),
        },
        Some(Value::String(s)) => {
            let scrubbed: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            match scrubbed.parse::<f64>() {
                Ok(f) => Coerced::parsed(f),
                Err(_) => Coerced::fallback(0.0),
            }
        }
        _ => Coerced::fallback(0.0),
    }
}

/// Coerces a GPS coordinate of the form `<hemisphere-letter><digits.digits>`
///
/// The hemisphere prefix (and any other stray character) falls to the same
/// scrub [`float`] applies, so `"N51.870209"` parses as `51.870209`.
pub fn coordinate(value: Option<&Value>) -> Coerced<f64> {
    float(value)
}

/// Coerces a value to an integer
///
/// Fractional numerics truncate toward zero. Missing or non-numeric input
/// yields 0.
pub fn int(value: Option<&Value>) -> Coerced<i64> {
    match value {
        Some(Value::Number(n)) => match n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)) {
            Some(i) => Coerced::parsed(i),
            None => Coerced::fallback(0),
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            match trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
            {
                Some(i) => Coerced::parsed(i),
                None => Coerced::fallback(0),
            }
        }
        _ => Coerced::fallback(0),
    }
}

/// Reads a plain numeric value, with no default
///
/// Used where presence matters, such as the epoch-seconds lookup and the
/// enumeration code lookups: `None` means "absent or not a number" and
/// lets the caller pick its own fallback path.
pub fn number(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
