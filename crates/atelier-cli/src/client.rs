//! Thin HTTP client for the Atelier admin API.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;

/// Default API base when neither `--api-url` nor `ATELIER_API_URL` is set.
const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

/// Connection settings for the API.
pub struct ApiClient {
    base_url: String,
    admin_token: Option<String>,
}

impl ApiClient {
    /// Resolves the API base URL and admin token from the flag and the
    /// `ATELIER_API_URL` / `ATELIER_ADMIN_TOKEN` environment variables.
    pub fn from_env(api_url_flag: Option<String>) -> Self {
        let base_url = api_url_flag
            .or_else(|| std::env::var("ATELIER_API_URL").ok())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            admin_token: std::env::var("ATELIER_ADMIN_TOKEN").ok(),
        }
    }

    /// The admin token, or an error telling the operator how to set it.
    fn require_token(&self) -> Result<&str> {
        self.admin_token
            .as_deref()
            .ok_or_else(|| anyhow!("ATELIER_ADMIN_TOKEN is not set"))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET without authentication.
    pub fn get_public(&self, path: &str) -> Result<Value> {
        let response = ureq::get(&self.url(path))
            .call()
            .map_err(flatten_error)?;
        response.into_json().context("Failed to parse response")
    }

    /// GET with the admin bearer token.
    pub fn get_admin(&self, path: &str) -> Result<Value> {
        let token = self.require_token()?;
        let response = ureq::get(&self.url(path))
            .set("Authorization", &format!("Bearer {}", token))
            .call()
            .map_err(flatten_error)?;
        response.into_json().context("Failed to parse response")
    }

    /// Sends a JSON body with the admin bearer token.
    pub fn send_admin(&self, method: &str, path: &str, body: Value) -> Result<Value> {
        let token = self.require_token()?;
        let response = ureq::request(method, &self.url(path))
            .set("Authorization", &format!("Bearer {}", token))
            .send_json(body)
            .map_err(flatten_error)?;
        response.into_json().context("Failed to parse response")
    }
}

/// Turns a ureq error into a readable message, surfacing the server's
/// `{"error": ...}` body when present.
fn flatten_error(error: ureq::Error) -> anyhow::Error {
    match error {
        ureq::Error::Status(code, response) => {
            let detail = response
                .into_json::<Value>()
                .ok()
                .and_then(|body| body["error"].as_str().map(str::to_string))
                .unwrap_or_else(|| "request failed".to_string());
            anyhow!("HTTP {}: {}", code, detail)
        }
        ureq::Error::Transport(transport) => anyhow!("transport error: {}", transport),
    }
}
