//! Parameter signing for gateway requests and notifications.
//!
//! The gateway uses a shared-key scheme: parameters are sorted by key,
//! concatenated as `k1=v1&k2=v2&...&key=API_KEY`, hashed with SHA-256 and
//! hex-encoded uppercase. The same computation verifies inbound
//! notifications, so a notification whose signature does not match the
//! merchant's API key is rejected before any order state changes.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Computes the signature over a sorted parameter map.
///
/// Empty values and the `sign` parameter itself are excluded, matching
/// the gateway's signing rules.
pub fn sign_params(params: &BTreeMap<String, String>, api_key: &str) -> String {
    let mut pieces: Vec<String> = Vec::with_capacity(params.len());
    for (key, value) in params {
        if key == "sign" || value.is_empty() {
            continue;
        }
        pieces.push(format!("{}={}", key, value));
    }
    let signing_string = format!("{}&key={}", pieces.join("&"), api_key);

    let mut hasher = Sha256::new();
    hasher.update(signing_string.as_bytes());
    hex::encode_upper(hasher.finalize())
}

/// Verifies a signature against the expected value for `params`.
///
/// Comparison is case-insensitive on the hex digits so either casing of
/// the digest is accepted.
pub fn verify_params(params: &BTreeMap<String, String>, api_key: &str, signature: &str) -> bool {
    let expected = sign_params(params, api_key);
    signature.eq_ignore_ascii_case(&expected)
}
