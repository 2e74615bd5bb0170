//! Redaction of recorded request/response data.
//!
//! Only the logged representation is redacted; transmitted payloads are never
//! touched.

use serde_json::{Map, Value};

/// Rendered in place of any password-like value.
pub const PLACEHOLDER: &str = "********";

/// Strings at least this long without whitespace are treated as opaque
/// credentials (tokens, bearer values, base64 blobs).
pub const OPAQUE_MIN_LEN: usize = 40;

const KEEP_PREFIX: usize = 12;
const KEEP_SUFFIX: usize = 6;

/// Substrings that mark a key as secret.
const SECRET_KEY_MARKERS: &[&str] = &["password", "passwd", "secret", "api_key", "apikey"];

/// Maximum length of raw (non-JSON) bodies kept in records.
pub const RAW_BODY_LIMIT: usize = 500;

/// Whether a field or header name carries a secret value.
pub(crate) fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SECRET_KEY_MARKERS.iter().any(|marker| key.contains(marker))
}

fn is_opaque(s: &str) -> bool {
    s.chars().count() >= OPAQUE_MIN_LEN && !s.chars().any(char::is_whitespace)
}

/// Shorten an opaque string to prefix + `...` + suffix. Short strings pass through.
pub fn mask_opaque(s: &str) -> String {
    if !is_opaque(s) {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let head: String = chars[..KEEP_PREFIX].iter().collect();
    let tail: String = chars[chars.len() - KEEP_SUFFIX..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Mask each opaque word of free text, leaving whitespace and short words intact.
pub fn mask_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    for c in text.chars() {
        if c.is_whitespace() {
            out.push_str(&mask_opaque(&word));
            word.clear();
            out.push(c);
        } else {
            word.push(c);
        }
    }
    out.push_str(&mask_opaque(&word));
    out
}

/// Redacted deep copy of a JSON value.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                let redacted = if is_secret_key(key) && !inner.is_null() {
                    Value::String(PLACEHOLDER.to_string())
                } else {
                    redact_value(inner)
                };
                out.insert(key.clone(), redacted);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::String(s) => Value::String(mask_opaque(s)),
        other => other.clone(),
    }
}

/// Redacted rendering of a header value.
pub fn redact_header(name: &str, value: &str) -> String {
    if is_secret_key(name) {
        return PLACEHOLDER.to_string();
    }
    if name.eq_ignore_ascii_case("authorization") {
        return match value.split_once(' ') {
            Some((scheme, token)) => format!("{} {}", scheme, mask_opaque(token)),
            None => mask_opaque(value),
        };
    }
    mask_opaque(value)
}

/// Truncate text to `limit` characters, marking the cut.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("... (truncated)");
    out
}
