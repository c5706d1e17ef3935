//! Payload Sanitization
//!
//! Redacts sensitive field names and PII-shaped substrings from arbitrary
//! nested JSON values before they are hashed or written to the audit log.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// Marker written in place of any redacted value.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Field names that are always redacted, matched case-insensitively as
/// substrings of the key.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "apikey",
    "api_key",
    "ssn",
    "creditcard",
    "credit_card",
    "cardnumber",
    "card_number",
    "cvv",
    "pin",
    "mfasecret",
    "mfa_secret",
    "authorization",
    "sessionid",
    "session_id",
    "privatekey",
    "private_key",
];

lazy_static! {
    // 13-16 digit runs with optional space/dash separators (card numbers).
    static ref CARD_REGEX: Regex =
        Regex::new(r"\b(?:\d[ \-]?){13,16}\b").unwrap();
    static ref SSN_REGEX: Regex = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();
}

#[derive(Debug, Clone, Default)]
pub struct Sanitizer;

impl Sanitizer {
    pub fn new() -> Self {
        Self
    }

    /// Recursively redact a JSON value. Keys matching the sensitive-name
    /// list are replaced wholesale with the redaction marker; surviving
    /// string values are additionally masked for PII-shaped substrings.
    pub fn redact(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (key, val) in map {
                    if is_sensitive_key(key) {
                        out.insert(key.clone(), Value::String(REDACTION_MARKER.to_string()));
                    } else {
                        out.insert(key.clone(), self.redact(val));
                    }
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.redact(v)).collect()),
            Value::String(s) => Value::String(self.mask_patterns(s)),
            other => other.clone(),
        }
    }

    /// Mask card-number- and SSN-shaped substrings inside a string value.
    pub fn mask_patterns(&self, input: &str) -> String {
        let masked = CARD_REGEX.replace_all(input, REDACTION_MARKER);
        SSN_REGEX.replace_all(&masked, REDACTION_MARKER).into_owned()
    }

    /// Serialize anything loggable into a redacted JSON value. The record
    /// pipeline routes every payload through here: one that cannot be
    /// serialized collapses to the redaction marker rather than erroring.
    pub fn redact_serializable<T: serde::Serialize>(&self, payload: &T) -> Value {
        match serde_json::to_value(payload) {
            Ok(value) => self.redact(&value),
            Err(_) => Value::String(REDACTION_MARKER.to_string()),
        }
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|s| lowered.contains(s))
}
