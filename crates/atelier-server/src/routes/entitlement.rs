//! Public entitlement lookup endpoint.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Capability;
use crate::entitlement::{compute_entitlement, latest_version, paid_orders_for, Entitlement};
use crate::error::AppError;
use crate::models::Work;
use crate::state::AppState;

/// Creates the entitlement router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(check_entitlement))
}

/// Query parameters for the entitlement check.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementQuery {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub work_id: Option<String>,
}

/// Validates the query, returning the normalized email and work id.
fn validate_query(query: &EntitlementQuery) -> Result<(String, Uuid), AppError> {
    let email = query
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("email is required".to_string()))?;
    if !email.contains('@') {
        return Err(AppError::BadRequest("email is not valid".to_string()));
    }

    let work_id = query
        .work_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("workId is required".to_string()))?;
    let work_id = Uuid::parse_str(work_id)
        .map_err(|_| AppError::BadRequest("workId is not a valid id".to_string()))?;

    Ok((email.to_string(), work_id))
}

/// GET /api/v1/entitlement?email=&workId=
///
/// Answers whether the buyer may access the work's current deliverables
/// and, for owners of an older version, what the upgrade costs.
/// Rate limited per (email, work) pair. Read-only: polling it never
/// mutates order state.
async fn check_entitlement(
    State(state): State<AppState>,
    capability: Capability,
    Query(query): Query<EntitlementQuery>,
) -> Result<Json<Entitlement>, AppError> {
    let (email, work_id) = validate_query(&query)?;

    let rate = state.limiter.check(&format!("{}:{}", email, work_id));
    if rate.exceeded {
        return Err(AppError::TooManyRequests {
            message: "Too many entitlement checks; try again shortly".to_string(),
            retry_after: rate.retry_after,
        });
    }

    let work: Option<Work> = sqlx::query_as(
        r#"
        SELECT id, slug, title, work_type, status, is_free, price, current_version,
               figma_url, delivery_url, category, tags, description, cover_url,
               created_at, updated_at
        FROM works
        WHERE id = $1
        "#,
    )
    .bind(work_id)
    .fetch_optional(&state.pool)
    .await?;

    // Drafts are indistinguishable from absent works for non-admins.
    let work = work
        .filter(|w| w.is_published() || capability.is_admin)
        .ok_or_else(|| AppError::NotFound("work not found".to_string()))?;

    let latest = latest_version(&state.pool, work.id).await?;
    let paid_orders = paid_orders_for(&state.pool, work.id, &email).await?;

    Ok(Json(compute_entitlement(
        &work,
        latest.as_ref(),
        &paid_orders,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(email: Option<&str>, work_id: Option<&str>) -> EntitlementQuery {
        EntitlementQuery {
            email: email.map(str::to_string),
            work_id: work_id.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_email_rejected() {
        let result = validate_query(&query(None, Some("550e8400-e29b-41d4-a716-446655440000")));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_email_without_at_rejected() {
        let result = validate_query(&query(
            Some("not-an-email"),
            Some("550e8400-e29b-41d4-a716-446655440000"),
        ));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_missing_work_id_rejected() {
        let result = validate_query(&query(Some("a@x.com"), None));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_malformed_work_id_rejected() {
        let result = validate_query(&query(Some("a@x.com"), Some("not-a-uuid")));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_valid_query_normalizes_email() {
        let (email, work_id) = validate_query(&query(
            Some("  a@x.com  "),
            Some("550e8400-e29b-41d4-a716-446655440000"),
        ))
        .unwrap();
        assert_eq!(email, "a@x.com");
        assert_eq!(
            work_id,
            Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap()
        );
    }
}
