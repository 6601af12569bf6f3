/// Identity records: the JSON value published under an id/ name
use super::{Fingerprint, IdentityName};
use crate::error::{KeyserverError, KeyserverResult};
use serde_json::{Map, Value};

/// Display fields used in index uid lines, in output order
pub const DISPLAY_FIELDS: [&str; 4] = ["name", "email", "country", "locality"];

/// Parsed identity value plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityRecord {
    pub name: IdentityName,
    pub value: Map<String, Value>,
    /// Block height of the last update
    pub height: u64,
}

impl IdentityRecord {
    /// Build a record from a backend value that is either JSON text or an object
    pub fn from_value(name: IdentityName, value: Value, height: u64) -> KeyserverResult<Self> {
        let decoded = match value {
            Value::String(text) => serde_json::from_str(&text).map_err(|e| {
                KeyserverError::MalformedRecord(format!("{}: invalid JSON value: {}", name, e))
            })?,
            other => other,
        };

        match decoded {
            Value::Object(value) => Ok(Self {
                name,
                value,
                height,
            }),
            other => Err(KeyserverError::MalformedRecord(format!(
                "{}: expected a JSON object, got {}",
                name,
                json_kind(&other)
            ))),
        }
    }

    /// The nested `gpg` object, if any
    pub fn gpg(&self) -> Option<&Map<String, Value>> {
        self.value.get("gpg").and_then(Value::as_object)
    }

    /// Owner-hosted key location from `gpg.uri`
    pub fn custom_key_uri(&self) -> Option<&str> {
        self.gpg()
            .and_then(|gpg| gpg.get("uri"))
            .and_then(Value::as_str)
            .filter(|uri| !uri.is_empty())
    }

    /// A display field flattened to text
    ///
    /// Lists contribute their first element, maps their `default` entry.
    pub fn display_field(&self, field: &str) -> Option<String> {
        let value = match self.value.get(field)? {
            Value::Array(items) => items.first()?,
            Value::Object(map) => map.get("default")?,
            scalar => scalar,
        };
        scalar_text(value)
    }

    /// Present display fields in [`DISPLAY_FIELDS`] order
    pub fn display_fields(&self) -> Vec<String> {
        DISPLAY_FIELDS
            .iter()
            .filter_map(|field| self.display_field(field))
            .collect()
    }
}

/// Pull the fingerprint out of a record
///
/// `gpg.fpr` is canonical; the top-level `fpr` predates the `gpg` object and
/// is only consulted when the nested one is missing.
pub fn extract_fingerprint(record: &IdentityRecord) -> KeyserverResult<Fingerprint> {
    let raw = record
        .gpg()
        .and_then(|gpg| gpg.get("fpr"))
        .or_else(|| record.value.get("fpr"))
        .ok_or_else(|| KeyserverError::NoFingerprint(record.name.to_string()))?;

    let text = raw.as_str().ok_or_else(|| {
        KeyserverError::BadFingerprint(format!("fingerprint of {} is not a string", record.name))
    })?;

    Fingerprint::parse(text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
