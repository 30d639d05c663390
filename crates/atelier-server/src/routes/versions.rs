//! Version sub-resource under a work.
//!
//! These handlers are the only writers of a work's mirrored
//! price/current-version/link fields. Each mutation runs in a single
//! transaction so a reader can never observe a version row without the
//! owning work's mirror already reflecting it, or vice versa.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::auth::Capability;
use crate::error::AppError;
use crate::models::{NewWorkVersion, Work, WorkVersion};
use crate::redact::redact;
use crate::state::AppState;

/// Creates the version routes nested under `/works`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/versions", get(list_versions).post(create_version))
        .route(
            "/{id}/versions/{version_id}",
            axum::routing::put(update_version).delete(delete_version),
        )
}

/// Locks and returns a work row for the duration of a transaction.
async fn lock_work(conn: &mut PgConnection, work_id: Uuid) -> Result<Work, AppError> {
    let work: Option<Work> = sqlx::query_as(
        r#"
        SELECT id, slug, title, work_type, status, is_free, price, current_version,
               figma_url, delivery_url, category, tags, description, cover_url,
               created_at, updated_at
        FROM works
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(work_id)
    .fetch_optional(conn)
    .await?;

    work.ok_or_else(|| AppError::NotFound("work not found".to_string()))
}

/// Most-recently-created version of a work, within a transaction.
async fn latest_version_tx(
    conn: &mut PgConnection,
    work_id: Uuid,
) -> Result<Option<WorkVersion>, AppError> {
    let version: Option<WorkVersion> = sqlx::query_as(
        r#"
        SELECT id, work_id, version, price, changelog, figma_url, delivery_url, created_at
        FROM work_versions
        WHERE work_id = $1
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(work_id)
    .fetch_optional(conn)
    .await?;
    Ok(version)
}

/// Rewrites the work's mirrored fields from a version row (or clears
/// them when no version remains).
async fn mirror_version_onto_work(
    conn: &mut PgConnection,
    work_id: Uuid,
    version: Option<&WorkVersion>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE works
        SET price = $2,
            current_version = $3,
            figma_url = $4,
            delivery_url = $5,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(work_id)
    .bind(version.map(|v| v.price.clone()))
    .bind(version.map(|v| v.version.clone()))
    .bind(version.and_then(|v| v.figma_url.clone()))
    .bind(version.and_then(|v| v.delivery_url.clone()))
    .execute(conn)
    .await?;
    Ok(())
}

/// Validates a version label and price.
fn validate_version_input(version: &str, price: &BigDecimal) -> Result<(), AppError> {
    if version.trim().is_empty() {
        return Err(AppError::BadRequest("version label is required".to_string()));
    }
    if price <= &BigDecimal::from(0) {
        return Err(AppError::BadRequest("price must be positive".to_string()));
    }
    Ok(())
}

/// Checks label uniqueness per work, ignoring at most one version id.
async fn check_label_available(
    conn: &mut PgConnection,
    work_id: Uuid,
    label: &str,
    ignore_id: Option<Uuid>,
) -> Result<(), AppError> {
    let existing: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM work_versions WHERE work_id = $1 AND version = $2 LIMIT 1",
    )
    .bind(work_id)
    .bind(label)
    .fetch_optional(conn)
    .await?;

    match existing {
        Some((id,)) if Some(id) != ignore_id => Err(AppError::Conflict(format!(
            "version '{}' already exists for this work",
            label
        ))),
        _ => Ok(()),
    }
}

/// GET /api/v1/works/{id}/versions
///
/// Version history, newest first. Public callers only see published
/// works and get the delivery fields redacted.
async fn list_versions(
    State(state): State<AppState>,
    capability: Capability,
    Path(id): Path<String>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    let work_id = parse_work_id(&id)?;
    ensure_work_visible(&state.pool, work_id, capability).await?;

    let versions: Vec<WorkVersion> = sqlx::query_as(
        r#"
        SELECT id, work_id, version, price, changelog, figma_url, delivery_url, created_at
        FROM work_versions
        WHERE work_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(work_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(
        versions
            .into_iter()
            .map(|version| {
                let value = serde_json::to_value(&version).unwrap_or_default();
                if capability.is_admin {
                    value
                } else {
                    redact(value)
                }
            })
            .collect(),
    ))
}

/// POST /api/v1/works/{id}/versions
///
/// Creates a version and updates the work's mirror in one transaction.
/// Omitted links are inherited from the prior latest version, falling
/// back to the work's own fields.
async fn create_version(
    State(state): State<AppState>,
    capability: Capability,
    Path(id): Path<String>,
    Json(request): Json<NewWorkVersion>,
) -> Result<Json<WorkVersion>, AppError> {
    capability.require_admin()?;
    let work_id = parse_work_id(&id)?;
    let label = request.version.trim().to_string();
    validate_version_input(&label, &request.price)?;

    let mut tx = state.pool.begin().await?;

    let work = lock_work(&mut *tx, work_id).await?;
    check_label_available(&mut *tx, work_id, &label, None).await?;
    let prior = latest_version_tx(&mut *tx, work_id).await?;

    let figma_url = request
        .figma_url
        .clone()
        .or_else(|| prior.as_ref().and_then(|v| v.figma_url.clone()))
        .or_else(|| work.figma_url.clone());
    let delivery_url = request
        .delivery_url
        .clone()
        .or_else(|| prior.as_ref().and_then(|v| v.delivery_url.clone()))
        .or_else(|| work.delivery_url.clone());

    let version: WorkVersion = sqlx::query_as(
        r#"
        INSERT INTO work_versions (id, work_id, version, price, changelog, figma_url,
                                   delivery_url, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        RETURNING id, work_id, version, price, changelog, figma_url, delivery_url, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(work_id)
    .bind(&label)
    .bind(&request.price)
    .bind(&request.changelog)
    .bind(&figma_url)
    .bind(&delivery_url)
    .fetch_one(&mut *tx)
    .await?;

    mirror_version_onto_work(&mut *tx, work_id, Some(&version)).await?;

    tx.commit().await?;
    Ok(Json(version))
}

/// Request body for editing a version. Absent fields are unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVersionRequest {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub price: Option<BigDecimal>,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub figma_url: Option<String>,
    #[serde(default)]
    pub delivery_url: Option<String>,
}

/// PUT /api/v1/works/{id}/versions/{version_id}
///
/// Edits a version's fields; when the edited version is the work's
/// current latest, the work's mirror is rewritten in the same
/// transaction.
async fn update_version(
    State(state): State<AppState>,
    capability: Capability,
    Path((id, version_id)): Path<(String, Uuid)>,
    Json(request): Json<UpdateVersionRequest>,
) -> Result<Json<WorkVersion>, AppError> {
    capability.require_admin()?;
    let work_id = parse_work_id(&id)?;

    if let Some(price) = &request.price {
        if price <= &BigDecimal::from(0) {
            return Err(AppError::BadRequest("price must be positive".to_string()));
        }
    }
    let new_label = request.version.as_deref().map(str::trim);
    if let Some(label) = new_label {
        if label.is_empty() {
            return Err(AppError::BadRequest("version label must not be empty".to_string()));
        }
    }

    let mut tx = state.pool.begin().await?;
    lock_work(&mut *tx, work_id).await?;

    if let Some(label) = new_label {
        check_label_available(&mut *tx, work_id, label, Some(version_id)).await?;
    }

    let updated: Option<WorkVersion> = sqlx::query_as(
        r#"
        UPDATE work_versions
        SET version = COALESCE($3, version),
            price = COALESCE($4, price),
            changelog = COALESCE($5, changelog),
            figma_url = COALESCE($6, figma_url),
            delivery_url = COALESCE($7, delivery_url)
        WHERE id = $1 AND work_id = $2
        RETURNING id, work_id, version, price, changelog, figma_url, delivery_url, created_at
        "#,
    )
    .bind(version_id)
    .bind(work_id)
    .bind(new_label)
    .bind(&request.price)
    .bind(&request.changelog)
    .bind(&request.figma_url)
    .bind(&request.delivery_url)
    .fetch_optional(&mut *tx)
    .await?;

    let updated = updated.ok_or_else(|| AppError::NotFound("version not found".to_string()))?;

    // Edits to the current version re-mirror onto the work.
    let latest = latest_version_tx(&mut *tx, work_id).await?;
    if latest.as_ref().map(|v| v.id) == Some(updated.id) {
        mirror_version_onto_work(&mut *tx, work_id, Some(&updated)).await?;
    }

    tx.commit().await?;
    Ok(Json(updated))
}

/// DELETE /api/v1/works/{id}/versions/{version_id}
///
/// Refuses while any PAID order references the version. Otherwise clears
/// the reference on non-PAID orders, deletes the version, and rolls the
/// work's mirror back to the next-most-recent version (or nulls).
async fn delete_version(
    State(state): State<AppState>,
    capability: Capability,
    Path((id, version_id)): Path<(String, Uuid)>,
) -> Result<Json<serde_json::Value>, AppError> {
    capability.require_admin()?;
    let work_id = parse_work_id(&id)?;

    let mut tx = state.pool.begin().await?;
    let work = lock_work(&mut *tx, work_id).await?;

    let version: Option<WorkVersion> = sqlx::query_as(
        r#"
        SELECT id, work_id, version, price, changelog, figma_url, delivery_url, created_at
        FROM work_versions
        WHERE id = $1 AND work_id = $2
        "#,
    )
    .bind(version_id)
    .bind(work_id)
    .fetch_optional(&mut *tx)
    .await?;
    let version = version.ok_or_else(|| AppError::NotFound("version not found".to_string()))?;

    let (paid_count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM orders WHERE version_id = $1 AND status = 'paid'",
    )
    .bind(version_id)
    .fetch_one(&mut *tx)
    .await?;
    if paid_count > 0 {
        return Err(AppError::Conflict(
            "version has paid orders and cannot be deleted".to_string(),
        ));
    }

    // Purchase history survives: the orders stay, only the pin is cleared.
    sqlx::query("UPDATE orders SET version_id = NULL WHERE version_id = $1 AND status <> 'paid'")
        .bind(version_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM work_versions WHERE id = $1")
        .bind(version_id)
        .execute(&mut *tx)
        .await?;

    if work.current_version.as_deref() == Some(version.version.as_str()) {
        let next = latest_version_tx(&mut *tx, work_id).await?;
        mirror_version_onto_work(&mut *tx, work_id, next.as_ref()).await?;
    }

    tx.commit().await?;
    Ok(Json(json!({ "ok": true })))
}

/// Parses a work id path segment.
fn parse_work_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest("work id is not a valid id".to_string()))
}

/// Rejects drafts for non-admin callers without revealing they exist.
async fn ensure_work_visible(
    pool: &PgPool,
    work_id: Uuid,
    capability: Capability,
) -> Result<(), AppError> {
    let visible: Option<(bool,)> = sqlx::query_as(
        "SELECT status = 'published' FROM works WHERE id = $1",
    )
    .bind(work_id)
    .fetch_optional(pool)
    .await?;

    match visible {
        Some((true,)) => Ok(()),
        Some((false,)) if capability.is_admin => Ok(()),
        _ => Err(AppError::NotFound("work not found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_validate_version_input_ok() {
        assert!(validate_version_input("2.0", &BigDecimal::from_str("80.00").unwrap()).is_ok());
    }

    #[test]
    fn test_validate_version_input_empty_label() {
        let result = validate_version_input("   ", &BigDecimal::from_str("80.00").unwrap());
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_validate_version_input_zero_price() {
        let result = validate_version_input("1.0", &BigDecimal::from(0));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_validate_version_input_negative_price() {
        let result = validate_version_input("1.0", &BigDecimal::from_str("-5").unwrap());
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_parse_work_id_rejects_garbage() {
        assert!(matches!(
            parse_work_id("not-a-uuid"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_parse_work_id_accepts_uuid() {
        assert!(parse_work_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
    }
}
