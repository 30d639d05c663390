//! Work routes: public catalogue reads and admin management.
//!
//! Mirrored price/link fields on a work are written only by the version
//! operations in [`super::versions`]; the update handler here deliberately
//! has no way to touch them.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::Capability;
use crate::error::AppError;
use crate::models::{NewWork, PublishStatus, Work, WorkType};
use crate::redact::redact;
use crate::state::AppState;

/// Maximum slug length.
const MAX_SLUG_LEN: usize = 120;

/// Creates the works router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_works).post(create_work).delete(batch_delete_works),
        )
        .route("/{id}", get(get_work).put(update_work).delete(delete_work))
}

/// Validates a URL slug: lowercase alphanumerics and hyphens.
fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        return Err(AppError::BadRequest(format!(
            "slug must be 1-{} characters",
            MAX_SLUG_LEN
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AppError::BadRequest(
            "slug may only contain lowercase letters, digits and hyphens".to_string(),
        ));
    }
    Ok(())
}

/// Checks slug uniqueness, ignoring at most one existing work id.
async fn check_slug_available(
    pool: &sqlx::PgPool,
    slug: &str,
    ignore_id: Option<Uuid>,
) -> Result<(), AppError> {
    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM works WHERE slug = $1 LIMIT 1")
            .bind(slug)
            .fetch_optional(pool)
            .await?;

    match existing {
        Some((id,)) if Some(id) != ignore_id => Err(AppError::Conflict(format!(
            "a work with slug '{}' already exists",
            slug
        ))),
        _ => Ok(()),
    }
}

/// Query parameters for the work listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWorksQuery {
    #[serde(default)]
    pub work_type: Option<WorkType>,
    #[serde(default)]
    pub category: Option<String>,
}

/// GET /api/v1/works
///
/// Public callers see published works with delivery fields redacted;
/// admins see everything raw, drafts included.
async fn list_works(
    State(state): State<AppState>,
    capability: Capability,
    Query(query): Query<ListWorksQuery>,
) -> Result<Json<Vec<serde_json::Value>>, AppError> {
    let works: Vec<Work> = sqlx::query_as(
        r#"
        SELECT id, slug, title, work_type, status, is_free, price, current_version,
               figma_url, delivery_url, category, tags, description, cover_url,
               created_at, updated_at
        FROM works
        WHERE ($1 OR status = 'published')
          AND ($2::work_type IS NULL OR work_type = $2)
          AND ($3::text IS NULL OR category = $3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(capability.is_admin)
    .bind(query.work_type)
    .bind(query.category)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(
        works
            .into_iter()
            .map(|work| {
                let value = serde_json::to_value(&work).unwrap_or_default();
                if capability.is_admin {
                    value
                } else {
                    redact(value)
                }
            })
            .collect(),
    ))
}

/// Loads a work by slug, falling back to id lookup when the path segment
/// parses as a UUID (the admin dashboard addresses works by id).
async fn find_work(pool: &sqlx::PgPool, slug_or_id: &str) -> Result<Option<Work>, AppError> {
    let work: Option<Work> = sqlx::query_as(
        r#"
        SELECT id, slug, title, work_type, status, is_free, price, current_version,
               figma_url, delivery_url, category, tags, description, cover_url,
               created_at, updated_at
        FROM works
        WHERE slug = $1 OR id = $2
        LIMIT 1
        "#,
    )
    .bind(slug_or_id)
    .bind(Uuid::parse_str(slug_or_id).ok())
    .fetch_optional(pool)
    .await?;

    Ok(work)
}

/// GET /api/v1/works/{slug}
async fn get_work(
    State(state): State<AppState>,
    capability: Capability,
    Path(slug): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let work = find_work(&state.pool, &slug)
        .await?
        .filter(|w| w.is_published() || capability.is_admin)
        .ok_or_else(|| AppError::NotFound("work not found".to_string()))?;

    let value = serde_json::to_value(&work)
        .map_err(|e| AppError::Internal(format!("Failed to serialize work: {}", e)))?;
    Ok(Json(if capability.is_admin {
        value
    } else {
        redact(value)
    }))
}

/// POST /api/v1/works
///
/// Creates a new draft work. Admin only. Version fields start null and
/// are populated by the first version creation.
async fn create_work(
    State(state): State<AppState>,
    capability: Capability,
    Json(request): Json<NewWork>,
) -> Result<Json<Work>, AppError> {
    capability.require_admin()?;
    validate_slug(&request.slug)?;
    if request.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }
    check_slug_available(&state.pool, &request.slug, None).await?;

    let work: Work = sqlx::query_as(
        r#"
        INSERT INTO works (id, slug, title, work_type, status, is_free, category, tags,
                           description, cover_url, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&request.slug)
    .bind(request.title.trim())
    .bind(request.work_type)
    .bind(PublishStatus::Draft)
    .bind(request.is_free)
    .bind(&request.category)
    .bind(&request.tags)
    .bind(&request.description)
    .bind(&request.cover_url)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(work))
}

/// Request body for updating a work. Absent fields are left unchanged;
/// the mirrored version fields are not editable here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkRequest {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub work_type: Option<WorkType>,
    #[serde(default)]
    pub status: Option<PublishStatus>,
    #[serde(default)]
    pub is_free: Option<bool>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}

/// PUT /api/v1/works/{id}
async fn update_work(
    State(state): State<AppState>,
    capability: Capability,
    Path(id): Path<String>,
    Json(request): Json<UpdateWorkRequest>,
) -> Result<Json<Work>, AppError> {
    capability.require_admin()?;
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::BadRequest("work id is not a valid id".to_string()))?;

    if let Some(slug) = &request.slug {
        validate_slug(slug)?;
        check_slug_available(&state.pool, slug, Some(id)).await?;
    }
    if let Some(title) = &request.title {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("title must not be empty".to_string()));
        }
    }

    let work: Option<Work> = sqlx::query_as(
        r#"
        UPDATE works
        SET slug = COALESCE($2, slug),
            title = COALESCE($3, title),
            work_type = COALESCE($4, work_type),
            status = COALESCE($5, status),
            is_free = COALESCE($6, is_free),
            category = COALESCE($7, category),
            tags = COALESCE($8, tags),
            description = COALESCE($9, description),
            cover_url = COALESCE($10, cover_url),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&request.slug)
    .bind(request.title.as_deref().map(str::trim))
    .bind(request.work_type)
    .bind(request.status)
    .bind(request.is_free)
    .bind(&request.category)
    .bind(&request.tags)
    .bind(&request.description)
    .bind(&request.cover_url)
    .fetch_optional(&state.pool)
    .await?;

    work.map(Json)
        .ok_or_else(|| AppError::NotFound("work not found".to_string()))
}

/// Counts orders referencing a work.
async fn order_count(pool: &sqlx::PgPool, work_id: Uuid) -> Result<i64, AppError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE work_id = $1")
        .bind(work_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// DELETE /api/v1/works/{id}
///
/// Referential-integrity guard: a work with any orders cannot be deleted,
/// whatever their status, so purchase history keeps its anchor row.
async fn delete_work(
    State(state): State<AppState>,
    capability: Capability,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    capability.require_admin()?;
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::BadRequest("work id is not a valid id".to_string()))?;

    if order_count(&state.pool, id).await? > 0 {
        return Err(AppError::Conflict(
            "work has orders and cannot be deleted".to_string(),
        ));
    }

    let rows = sqlx::query("DELETE FROM works WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(AppError::NotFound("work not found".to_string()));
    }
    Ok(Json(json!({ "ok": true })))
}

/// Request body for batch work deletion.
#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    pub ids: Vec<Uuid>,
}

/// Itemized result of a batch deletion.
#[derive(Debug, Serialize)]
pub struct BatchDeleteResponse {
    pub ok: bool,
    pub partial: bool,
    pub deleted: Vec<Uuid>,
    pub blocked: Vec<Uuid>,
}

/// DELETE /api/v1/works
///
/// Best-effort bulk delete: works with orders are reported as blocked
/// rather than failing the whole batch.
async fn batch_delete_works(
    State(state): State<AppState>,
    capability: Capability,
    Json(request): Json<BatchDeleteRequest>,
) -> Result<Json<BatchDeleteResponse>, AppError> {
    capability.require_admin()?;
    if request.ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".to_string()));
    }

    let mut deleted = Vec::new();
    let mut blocked = Vec::new();
    for id in request.ids {
        if order_count(&state.pool, id).await? > 0 {
            blocked.push(id);
            continue;
        }
        let rows = sqlx::query("DELETE FROM works WHERE id = $1")
            .bind(id)
            .execute(&state.pool)
            .await?
            .rows_affected();
        if rows > 0 {
            deleted.push(id);
        }
    }

    Ok(Json(BatchDeleteResponse {
        ok: true,
        partial: !blocked.is_empty(),
        deleted,
        blocked,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug_accepts_kebab_case() {
        assert!(validate_slug("poster-pack-2").is_ok());
    }

    #[test]
    fn test_validate_slug_rejects_empty() {
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_validate_slug_rejects_uppercase() {
        assert!(validate_slug("Poster").is_err());
    }

    #[test]
    fn test_validate_slug_rejects_spaces_and_slashes() {
        assert!(validate_slug("poster pack").is_err());
        assert!(validate_slug("poster/pack").is_err());
    }

    #[test]
    fn test_validate_slug_rejects_overlong() {
        let slug = "a".repeat(MAX_SLUG_LEN + 1);
        assert!(validate_slug(&slug).is_err());
    }

    #[test]
    fn test_batch_response_shape() {
        let response = BatchDeleteResponse {
            ok: true,
            partial: true,
            deleted: vec![],
            blocked: vec![Uuid::new_v4()],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["partial"], true);
        assert_eq!(json["blocked"].as_array().unwrap().len(), 1);
    }
}
