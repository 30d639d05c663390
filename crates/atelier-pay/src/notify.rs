//! Verification of asynchronous payment notifications.
//!
//! The gateway posts a flat JSON object of string fields plus a `sign`
//! field computed with the shared API key. Verification recomputes the
//! signature over every string field except `sign`, so extra fields a
//! newer gateway version adds still verify correctly.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::error::PayError;
use crate::sign::verify_params;

/// A payment notification whose signature has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    /// Merchant-side order number the payment settles.
    pub order_no: String,
    /// Gateway-side transaction id.
    pub transaction_id: String,
    /// Decimal amount paid, as reported by the gateway.
    pub amount: String,
    /// Completion time, when the gateway reported one.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Verifies a notification payload and extracts the payment facts.
///
/// Fails with [`PayError::BadSignature`] on a signature mismatch, and
/// [`PayError::Malformed`] when required fields are absent or the result
/// code is not `SUCCESS`. Never mutates any state: deciding what to do
/// with a verified payment is the caller's job.
pub fn verify_notification(
    payload: &serde_json::Value,
    api_key: &str,
) -> Result<VerifiedPayment, PayError> {
    let object = payload
        .as_object()
        .ok_or_else(|| PayError::Malformed("notification is not a JSON object".to_string()))?;

    let mut params = BTreeMap::new();
    for (key, value) in object {
        if key == "sign" {
            continue;
        }
        if let Some(text) = value.as_str() {
            params.insert(key.clone(), text.to_string());
        }
    }

    let signature = object
        .get("sign")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PayError::Malformed("missing sign field".to_string()))?;

    if !verify_params(&params, api_key, signature) {
        return Err(PayError::BadSignature);
    }

    let result_code = params
        .get("resultCode")
        .map(String::as_str)
        .unwrap_or_default();
    if result_code != "SUCCESS" {
        return Err(PayError::Malformed(format!(
            "notification result code is '{}', not SUCCESS",
            result_code
        )));
    }

    let order_no = require_field(&params, "orderNo")?;
    let transaction_id = require_field(&params, "transactionId")?;
    let amount = require_field(&params, "totalAmount")?;

    let paid_at = params
        .get("timeEnd")
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(VerifiedPayment {
        order_no,
        transaction_id,
        amount,
        paid_at,
    })
}

fn require_field(params: &BTreeMap<String, String>, name: &str) -> Result<String, PayError> {
    params
        .get(name)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| PayError::Malformed(format!("missing {} field", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::sign_params;
    use serde_json::json;

    const API_KEY: &str = "test-api-key";

    /// Builds a signed notification payload for tests.
    fn signed_notification(fields: &[(&str, &str)]) -> serde_json::Value {
        let mut params = BTreeMap::new();
        for (key, value) in fields {
            params.insert(key.to_string(), value.to_string());
        }
        let sign = sign_params(&params, API_KEY);
        let mut object = serde_json::Map::new();
        for (key, value) in &params {
            object.insert(key.clone(), json!(value));
        }
        object.insert("sign".to_string(), json!(sign));
        serde_json::Value::Object(object)
    }

    fn base_fields<'a>() -> Vec<(&'a str, &'a str)> {
        vec![
            ("appId", "app123"),
            ("mchId", "m456"),
            ("orderNo", "ATL-20260101-DEADBEEF"),
            ("transactionId", "4200001234"),
            ("totalAmount", "80.00"),
            ("resultCode", "SUCCESS"),
            ("timeEnd", "2026-01-01T12:30:00Z"),
            ("nonceStr", "abcd1234"),
        ]
    }

    #[test]
    fn test_valid_notification_verifies() {
        let payload = signed_notification(&base_fields());
        let payment = verify_notification(&payload, API_KEY).unwrap();
        assert_eq!(payment.order_no, "ATL-20260101-DEADBEEF");
        assert_eq!(payment.transaction_id, "4200001234");
        assert_eq!(payment.amount, "80.00");
        let paid_at = payment.paid_at.expect("timeEnd should parse");
        assert_eq!(paid_at.to_rfc3339(), "2026-01-01T12:30:00+00:00");
    }

    #[test]
    fn test_wrong_key_rejected() {
        let payload = signed_notification(&base_fields());
        let err = verify_notification(&payload, "another-key").unwrap_err();
        assert!(matches!(err, PayError::BadSignature));
    }

    #[test]
    fn test_tampered_amount_rejected() {
        let mut payload = signed_notification(&base_fields());
        payload["totalAmount"] = json!("0.01");
        let err = verify_notification(&payload, API_KEY).unwrap_err();
        assert!(matches!(err, PayError::BadSignature));
    }

    #[test]
    fn test_missing_sign_is_malformed() {
        let mut payload = signed_notification(&base_fields());
        payload.as_object_mut().unwrap().remove("sign");
        let err = verify_notification(&payload, API_KEY).unwrap_err();
        assert!(matches!(err, PayError::Malformed(_)));
    }

    #[test]
    fn test_non_success_result_code_is_malformed() {
        let mut fields = base_fields();
        fields.retain(|(k, _)| *k != "resultCode");
        fields.push(("resultCode", "FAIL"));
        let payload = signed_notification(&fields);
        let err = verify_notification(&payload, API_KEY).unwrap_err();
        assert!(matches!(err, PayError::Malformed(_)));
    }

    #[test]
    fn test_missing_order_no_is_malformed() {
        let mut fields = base_fields();
        fields.retain(|(k, _)| *k != "orderNo");
        let payload = signed_notification(&fields);
        let err = verify_notification(&payload, API_KEY).unwrap_err();
        assert!(matches!(err, PayError::Malformed(_)));
    }

    #[test]
    fn test_extra_fields_still_verify() {
        let mut fields = base_fields();
        fields.push(("attach", "campaign-42"));
        let payload = signed_notification(&fields);
        assert!(verify_notification(&payload, API_KEY).is_ok());
    }

    #[test]
    fn test_unparseable_time_end_yields_none() {
        let mut fields = base_fields();
        fields.retain(|(k, _)| *k != "timeEnd");
        fields.push(("timeEnd", "20260101123000"));
        let payload = signed_notification(&fields);
        let payment = verify_notification(&payload, API_KEY).unwrap();
        assert!(payment.paid_at.is_none());
    }

    #[test]
    fn test_array_payload_is_malformed() {
        let err = verify_notification(&json!(["not", "an", "object"]), API_KEY).unwrap_err();
        assert!(matches!(err, PayError::Malformed(_)));
    }
}
