//! API routes for the Atelier server.

pub mod entitlement;
pub mod orders;
pub mod posts;
pub mod versions;
pub mod works;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppError;
use crate::state::AppState;

/// Creates the main API router with all routes mounted.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/v1", api_v1_routes())
        .with_state(state)
}

/// Creates the v1 API routes.
fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/works", works::router().merge(versions::router()))
        .nest("/orders", orders::router())
        .nest("/entitlement", entitlement::router())
        .nest("/posts", posts::router())
}

/// GET /healthz - liveness probe with a database ping.
async fn healthz(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&state.pool).await?;
    Ok(Json(serde_json::json!({ "ok": one == 1 })))
}
