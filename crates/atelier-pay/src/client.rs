//! HTTP client for the wallet gateway.

use rand::Rng;
use std::time::Duration;

use crate::config::PayConfig;
use crate::error::PayError;
use crate::sign::sign_params;
use crate::types::{UnifiedOrderRequest, UnifiedOrderResponse};

/// Number of random bytes in a request nonce.
const NONCE_BYTES: usize = 16;

/// Client for creating payment orders against the gateway.
pub struct PayClient {
    config: PayConfig,
    http: reqwest::Client,
}

impl PayClient {
    /// Builds a client with the configured request timeout.
    pub fn new(config: PayConfig) -> Result<Self, PayError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    /// Creates a scan-to-pay order and returns its `code_url`.
    ///
    /// `amount` is the decimal amount as a string, e.g. `"80.00"`.
    /// Transport failures and gateway rejections surface as [`PayError`];
    /// the caller maps them onto its own error taxonomy.
    pub async fn create_native_order(
        &self,
        order_no: &str,
        amount: &str,
        description: &str,
    ) -> Result<String, PayError> {
        let mut request = UnifiedOrderRequest {
            app_id: self.config.app_id.clone(),
            mch_id: self.config.merchant_id.clone(),
            nonce_str: generate_nonce(),
            order_no: order_no.to_string(),
            description: description.to_string(),
            total_amount: amount.to_string(),
            notify_url: self.config.notify_url.clone(),
            trade_type: "NATIVE".to_string(),
            sign: String::new(),
        };
        request.sign = sign_params(&request.signing_params(), &self.config.api_key);

        let url = format!("{}/pay/unifiedorder", self.config.api_base);
        let response: UnifiedOrderResponse = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_order_response(response)
    }
}

/// Generates a random hex nonce for a gateway request.
fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; NONCE_BYTES] = rng.gen();
    hex::encode(bytes)
}

/// Extracts the `code_url` from a gateway response, mapping failures
/// onto [`PayError::Rejected`].
fn parse_order_response(response: UnifiedOrderResponse) -> Result<String, PayError> {
    if response.return_code != "SUCCESS" {
        return Err(PayError::Rejected {
            code: response.return_code,
            message: response
                .err_code_des
                .unwrap_or_else(|| "gateway communication failed".to_string()),
        });
    }
    if response.result_code.as_deref() != Some("SUCCESS") {
        return Err(PayError::Rejected {
            code: response.err_code.unwrap_or_else(|| "FAIL".to_string()),
            message: response
                .err_code_des
                .unwrap_or_else(|| "order creation refused".to_string()),
        });
    }
    response
        .code_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| PayError::Malformed("missing code_url in successful response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success_response(code_url: Option<&str>) -> UnifiedOrderResponse {
        UnifiedOrderResponse {
            return_code: "SUCCESS".to_string(),
            result_code: Some("SUCCESS".to_string()),
            code_url: code_url.map(str::to_string),
            err_code: None,
            err_code_des: None,
        }
    }

    #[test]
    fn test_nonce_is_hex_of_expected_length() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_BYTES * 2);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_parse_success_returns_code_url() {
        let url = parse_order_response(success_response(Some("weixin://wxpay/abc"))).unwrap();
        assert_eq!(url, "weixin://wxpay/abc");
    }

    #[test]
    fn test_parse_protocol_failure() {
        let response = UnifiedOrderResponse {
            return_code: "FAIL".to_string(),
            result_code: None,
            code_url: None,
            err_code: None,
            err_code_des: Some("signature mismatch".to_string()),
        };
        let err = parse_order_response(response).unwrap_err();
        assert!(matches!(err, PayError::Rejected { .. }));
        assert!(err.to_string().contains("signature mismatch"));
    }

    #[test]
    fn test_parse_business_failure() {
        let response = UnifiedOrderResponse {
            return_code: "SUCCESS".to_string(),
            result_code: Some("FAIL".to_string()),
            code_url: None,
            err_code: Some("ORDERPAID".to_string()),
            err_code_des: Some("order already paid".to_string()),
        };
        let err = parse_order_response(response).unwrap_err();
        match err {
            PayError::Rejected { code, message } => {
                assert_eq!(code, "ORDERPAID");
                assert_eq!(message, "order already paid");
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_code_url_is_malformed() {
        let err = parse_order_response(success_response(None)).unwrap_err();
        assert!(matches!(err, PayError::Malformed(_)));
    }

    #[test]
    fn test_parse_empty_code_url_is_malformed() {
        let err = parse_order_response(success_response(Some(""))).unwrap_err();
        assert!(matches!(err, PayError::Malformed(_)));
    }
}
