//! Response envelope normalization.
//!
//! The API usually wraps payloads as `{"data": ...}`, but not always, and list
//! endpoints answer either with a bare array or with an object that holds the
//! list under an endpoint-specific key. Both quirks are resolved here so step
//! logic only ever sees a payload [`Value`] or a [`Collection`].

use serde_json::Value;

/// Keys under which list endpoints nest their items.
pub const COLLECTION_KEYS: &[&str] = &[
    "items",
    "notifications",
    "requests",
    "messages",
    "workspaces",
    "branches",
    "rules",
    "floor_plans",
    "variants",
    "scenes",
];

/// Returns the payload of a response body: the `data` member when present,
/// otherwise the body itself.
pub fn payload(body: &Value) -> &Value {
    match body.get("data") {
        Some(data) if !data.is_null() => data,
        _ => body,
    }
}

/// Reads a non-empty string (or number, rendered) field from a payload.
pub fn str_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads the first present field among `keys`.
pub fn first_str_field(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| str_field(payload, key))
}

/// Extracts a human-readable error message from an error body, if any.
pub fn error_message(body: &Value) -> Option<String> {
    let candidate = body
        .get("error")
        .or_else(|| body.get("message"))
        .or_else(|| body.get("detail"))?;
    match candidate {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(_) => first_str_field(candidate, &["message", "code"]),
        _ => None,
    }
}

/// Canonical list container produced from either response shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    items: Vec<Value>,
}

impl Collection {
    /// Normalize a full response body (envelope included).
    pub fn from_body(body: &Value) -> Self {
        let items = match payload(body) {
            Value::Array(items) => items.clone(),
            Value::Object(map) => COLLECTION_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array))
                .cloned()
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    /// Ids of all items that carry one.
    pub fn ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| str_field(item, "id"))
            .collect()
    }
}
