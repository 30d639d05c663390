//! Error types for the Atelier server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Application error type.
///
/// Core operations return these instead of panicking or leaking storage
/// errors across the component boundary; the `IntoResponse` impl is the
/// single place errors are mapped to HTTP.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limit exceeded: {message}")]
    TooManyRequests {
        message: String,
        /// Seconds until rate limit resets.
        retry_after: u64,
    },

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serializes an error body as `{"error": msg}`.
fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, &msg),
            AppError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, &msg),
            AppError::Conflict(msg) => error_body(StatusCode::CONFLICT, &msg),
            AppError::Unauthorized(msg) => error_body(StatusCode::UNAUTHORIZED, &msg),
            AppError::Forbidden(msg) => error_body(StatusCode::FORBIDDEN, &msg),
            AppError::TooManyRequests {
                message,
                retry_after,
            } => {
                let mut response = error_body(StatusCode::TOO_MANY_REQUESTS, &message);
                response.headers_mut().insert(
                    axum::http::header::RETRY_AFTER,
                    axum::http::HeaderValue::from_str(&retry_after.to_string())
                        .unwrap_or_else(|_| axum::http::HeaderValue::from_static("60")),
                );
                response
            }
            AppError::Gateway(msg) => {
                tracing::error!("Payment gateway error: {}", msg);
                error_body(StatusCode::BAD_GATEWAY, "Payment gateway unavailable")
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("work not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let response = AppError::Conflict("order is not pending".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_gateway_maps_to_502() {
        let response = AppError::Gateway("timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_rate_limited_carries_retry_after_header() {
        let response = AppError::TooManyRequests {
            message: "slow down".to_string(),
            retry_after: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let header = response
            .headers()
            .get(axum::http::header::RETRY_AFTER)
            .expect("Retry-After header");
        assert_eq!(header.to_str().unwrap(), "42");
    }
}
