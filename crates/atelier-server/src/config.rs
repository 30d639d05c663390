//! Server configuration loaded from the environment.

use atelier_pay::PayConfig;

/// Default bind host.
const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port.
const DEFAULT_PORT: u16 = 8080;

/// SMTP settings for the delivery-notification worker.
///
/// Absent `SMTP_HOST` means email delivery is not configured; paid-order
/// events are then logged instead of mailed.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname.
    pub host: String,
    /// SMTP server port (defaults to 587).
    pub port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub user: Option<String>,
    /// Optional SMTP password.
    pub password: Option<String>,
}

impl SmtpConfig {
    /// Load SMTP configuration; `None` when `SMTP_HOST` is unset.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            host,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| "noreply@atelier.local".to_string()),
            user: std::env::var("SMTP_USER").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Allowed CORS origins; empty disables CORS restrictions entirely
    /// (development default).
    pub cors_origins: Vec<String>,
    /// Bearer token granting the admin capability.
    pub admin_token: String,
    /// Whether the admin simulate-pay endpoint is enabled.
    pub allow_simulate_pay: bool,
    /// Payment gateway credentials, when configured.
    pub pay: Option<PayConfig>,
    /// SMTP delivery settings, when configured.
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable             | Required | Default       |
    /// |----------------------|----------|---------------|
    /// | `HOST`               | no       | `127.0.0.1`   |
    /// | `PORT`               | no       | `8080`        |
    /// | `CORS_ORIGINS`       | no       | — (comma-sep) |
    /// | `ADMIN_TOKEN`        | yes      | —             |
    /// | `APP_ENV`            | no       | `development` |
    /// | `ALLOW_SIMULATE_PAY` | no       | see below     |
    ///
    /// Simulate-pay defaults to enabled outside production and is only
    /// available in production when `ALLOW_SIMULATE_PAY=1` is set
    /// explicitly.
    pub fn from_env() -> Self {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let allow_simulate_pay = match std::env::var("ALLOW_SIMULATE_PAY").as_deref() {
            Ok("1") | Ok("true") => true,
            Ok(_) => false,
            Err(_) => app_env != "production",
        };

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            admin_token: std::env::var("ADMIN_TOKEN").expect("ADMIN_TOKEN must be set"),
            allow_simulate_pay,
            pay: PayConfig::from_env(),
            smtp: SmtpConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smtp_config_none_without_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(SmtpConfig::from_env().is_none());
    }
}
