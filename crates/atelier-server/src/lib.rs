//! Atelier Server - API for the studio portfolio platform
//!
//! This crate provides the REST API server for the studio's public site
//! and admin dashboard: works and their versions, blog posts, orders and
//! the entitlement/upgrade-pricing logic behind paid downloads.

pub mod auth;
pub mod config;
pub mod db;
pub mod entitlement;
pub mod error;
pub mod events;
pub mod models;
pub mod notify;
pub mod rate_limit;
pub mod redact;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
