//! Atelier Pay - wallet payment gateway adapter
//!
//! This crate talks to the studio's wallet payment provider: it signs
//! outbound requests, creates scannable "native" payment orders, verifies
//! asynchronous payment notifications, and renders payment URIs as QR
//! data URLs.

pub mod client;
pub mod config;
pub mod error;
pub mod notify;
pub mod qr;
pub mod sign;
pub mod types;

pub use client::PayClient;
pub use config::PayConfig;
pub use error::PayError;
pub use notify::{verify_notification, VerifiedPayment};
pub use qr::qr_svg_data_url;
pub use sign::{sign_params, verify_params};
pub use types::{UnifiedOrderRequest, UnifiedOrderResponse};
