//! Shared application state.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::events::EventBus;
use crate::rate_limit::RateLimiter;

/// Shared state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,
    /// Server configuration.
    pub config: Arc<AppConfig>,
    /// Process-wide rate limiter for public lookup endpoints.
    pub limiter: Arc<RateLimiter>,
    /// Event bus for paid-order notifications.
    pub events: Arc<EventBus>,
    /// Payment gateway client, when credentials are configured.
    pub pay: Option<Arc<atelier_pay::PayClient>>,
}

impl AppState {
    /// Builds the state from configuration, wiring up the limiter, event
    /// bus and (when configured) the gateway client.
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        let pay = config.pay.clone().and_then(|pay_config| {
            match atelier_pay::PayClient::new(pay_config) {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    tracing::error!("Failed to build payment gateway client: {}", e);
                    None
                }
            }
        });

        Self {
            pool,
            config: Arc::new(config),
            limiter: Arc::new(RateLimiter::default()),
            events: Arc::new(EventBus::default()),
            pay,
        }
    }
}
