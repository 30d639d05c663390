//! Gateway configuration loaded from the environment.

/// Default API base when `PAY_API_BASE` is not set.
const DEFAULT_API_BASE: &str = "https://gateway.walletpay.example/v2";

/// Default timeout for gateway HTTP calls, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Credentials and endpoints for the wallet payment gateway.
#[derive(Debug, Clone)]
pub struct PayConfig {
    /// Application id issued by the gateway.
    pub app_id: String,
    /// Merchant account id.
    pub merchant_id: String,
    /// Shared secret used to sign requests and verify notifications.
    pub api_key: String,
    /// Base URL of the gateway API.
    pub api_base: String,
    /// Public URL the gateway posts asynchronous notifications to.
    /// Empty when not configured; the parameter is then omitted.
    pub notify_url: String,
    /// Timeout applied to every gateway HTTP call.
    pub timeout_secs: u64,
}

impl PayConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` unless `PAY_APP_ID`, `PAY_MERCHANT_ID` and
    /// `PAY_API_KEY` are all set, signalling that the gateway is not
    /// configured and payment creation should be rejected.
    ///
    /// | Variable          | Required | Default                                  |
    /// |-------------------|----------|------------------------------------------|
    /// | `PAY_APP_ID`      | yes      | —                                        |
    /// | `PAY_MERCHANT_ID` | yes      | —                                        |
    /// | `PAY_API_KEY`     | yes      | —                                        |
    /// | `PAY_API_BASE`    | no       | `https://gateway.walletpay.example/v2`   |
    /// | `PAY_NOTIFY_URL`  | no       | —                                        |
    pub fn from_env() -> Option<Self> {
        let app_id = std::env::var("PAY_APP_ID").ok()?;
        let merchant_id = std::env::var("PAY_MERCHANT_ID").ok()?;
        let api_key = std::env::var("PAY_API_KEY").ok()?;
        Some(Self {
            app_id,
            merchant_id,
            api_key,
            api_base: std::env::var("PAY_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            notify_url: std::env::var("PAY_NOTIFY_URL").unwrap_or_default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }
}
