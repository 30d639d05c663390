//! Wire types for the wallet gateway's "native" (scan-to-pay) API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request body for creating a native payment order.
///
/// The `sign` field is computed over the other non-empty fields with
/// [`crate::sign::sign_params`] before serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedOrderRequest {
    /// Application id issued by the gateway.
    pub app_id: String,
    /// Merchant account id.
    pub mch_id: String,
    /// Random nonce, hex-encoded.
    pub nonce_str: String,
    /// Merchant-side order number.
    pub order_no: String,
    /// Human-readable order description shown in the wallet app.
    pub description: String,
    /// Decimal amount as a string, e.g. `"80.00"`.
    pub total_amount: String,
    /// URL the gateway posts the asynchronous notification to.
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub notify_url: String,
    /// Always `"NATIVE"` for scan-to-pay orders.
    pub trade_type: String,
    /// Uppercase hex SHA-256 signature.
    pub sign: String,
}

impl UnifiedOrderRequest {
    /// Flattens the request into the parameter map the signature is
    /// computed over (everything except `sign`).
    pub fn signing_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("appId".to_string(), self.app_id.clone());
        params.insert("mchId".to_string(), self.mch_id.clone());
        params.insert("nonceStr".to_string(), self.nonce_str.clone());
        params.insert("orderNo".to_string(), self.order_no.clone());
        params.insert("description".to_string(), self.description.clone());
        params.insert("totalAmount".to_string(), self.total_amount.clone());
        params.insert("notifyUrl".to_string(), self.notify_url.clone());
        params.insert("tradeType".to_string(), self.trade_type.clone());
        params
    }
}

/// Response body for a native payment order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedOrderResponse {
    /// Protocol-level status: `"SUCCESS"` when the request was accepted.
    pub return_code: String,
    /// Business-level status: `"SUCCESS"` when an order was created.
    #[serde(default)]
    pub result_code: Option<String>,
    /// Scannable payment URI, present on success.
    #[serde(default)]
    pub code_url: Option<String>,
    /// Machine-readable error code on failure.
    #[serde(default)]
    pub err_code: Option<String>,
    /// Human-readable error description on failure.
    #[serde(default)]
    pub err_code_des: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = UnifiedOrderRequest {
            app_id: "app123".to_string(),
            mch_id: "m456".to_string(),
            nonce_str: "abcd".to_string(),
            order_no: "ATL-20260101-DEADBEEF".to_string(),
            description: "Poster pack v2".to_string(),
            total_amount: "80.00".to_string(),
            notify_url: "https://studio.example/api/v1/orders/notify".to_string(),
            trade_type: "NATIVE".to_string(),
            sign: "ABC".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"appId\":\"app123\""));
        assert!(json.contains("\"orderNo\":\"ATL-20260101-DEADBEEF\""));
        assert!(json.contains("\"tradeType\":\"NATIVE\""));
    }

    #[test]
    fn test_empty_notify_url_is_omitted() {
        let request = UnifiedOrderRequest {
            app_id: "app123".to_string(),
            mch_id: "m456".to_string(),
            nonce_str: "abcd".to_string(),
            order_no: "ATL-1".to_string(),
            description: "x".to_string(),
            total_amount: "1.00".to_string(),
            notify_url: String::new(),
            trade_type: "NATIVE".to_string(),
            sign: "ABC".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("notifyUrl"));
    }

    #[test]
    fn test_signing_params_exclude_sign() {
        let request = UnifiedOrderRequest {
            app_id: "app123".to_string(),
            mch_id: "m456".to_string(),
            nonce_str: "abcd".to_string(),
            order_no: "ATL-1".to_string(),
            description: "x".to_string(),
            total_amount: "1.00".to_string(),
            notify_url: String::new(),
            trade_type: "NATIVE".to_string(),
            sign: "ABC".to_string(),
        };
        let params = request.signing_params();
        assert!(!params.contains_key("sign"));
        assert_eq!(params.get("appId").map(String::as_str), Some("app123"));
    }

    #[test]
    fn test_error_response_deserializes() {
        let json = r#"{
            "returnCode": "SUCCESS",
            "resultCode": "FAIL",
            "errCode": "ORDERPAID",
            "errCodeDes": "order already paid"
        }"#;
        let response: UnifiedOrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.return_code, "SUCCESS");
        assert_eq!(response.result_code.as_deref(), Some("FAIL"));
        assert_eq!(response.err_code.as_deref(), Some("ORDERPAID"));
        assert!(response.code_url.is_none());
    }
}
