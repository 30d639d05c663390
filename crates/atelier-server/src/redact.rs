//! Redaction of delivery-sensitive fields from public responses.
//!
//! Entitlement to one work never grants visibility of another work's
//! delivery links, so every non-admin read path passes its JSON through
//! [`redact`] as the last step before serialization. The function is
//! total: partial records, non-objects and nested shapes are all fine.

use serde_json::Value;

/// Keys that must never reach a caller without the admin capability.
pub const SENSITIVE_KEYS: [&str; 4] = ["figmaUrl", "deliveryUrl", "fileUrl", "fileName"];

/// Removes the sensitive keys from a JSON value, recursing through
/// nested objects and arrays, and returns the remainder unchanged.
pub fn redact(mut value: Value) -> Value {
    redact_in_place(&mut value);
    value
}

/// In-place variant of [`redact`].
pub fn redact_in_place(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in SENSITIVE_KEYS {
                map.remove(key);
            }
            for nested in map.values_mut() {
                redact_in_place(nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_in_place(item);
            }
        }
        _ => {}
    }
}
