//! Blog post routes.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::Capability;
use crate::error::AppError;
use crate::models::{NewPost, Post, PublishStatus};
use crate::state::AppState;

/// Creates the posts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{slug}", get(get_post).put(update_post).delete(delete_post))
}

/// GET /api/v1/posts
///
/// Public callers see published posts only; admins see drafts too.
async fn list_posts(
    State(state): State<AppState>,
    capability: Capability,
) -> Result<Json<Vec<Post>>, AppError> {
    let posts: Vec<Post> = sqlx::query_as(
        r#"
        SELECT id, slug, title, summary, content, status, category, tags,
               created_at, updated_at
        FROM posts
        WHERE $1 OR status = 'published'
        ORDER BY created_at DESC
        "#,
    )
    .bind(capability.is_admin)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(posts))
}

/// Loads a post by slug, falling back to id lookup.
async fn find_post(pool: &sqlx::PgPool, slug_or_id: &str) -> Result<Option<Post>, AppError> {
    let post: Option<Post> = sqlx::query_as(
        r#"
        SELECT id, slug, title, summary, content, status, category, tags,
               created_at, updated_at
        FROM posts
        WHERE slug = $1 OR id = $2
        LIMIT 1
        "#,
    )
    .bind(slug_or_id)
    .bind(Uuid::parse_str(slug_or_id).ok())
    .fetch_optional(pool)
    .await?;
    Ok(post)
}

/// GET /api/v1/posts/{slug}
async fn get_post(
    State(state): State<AppState>,
    capability: Capability,
    Path(slug): Path<String>,
) -> Result<Json<Post>, AppError> {
    find_post(&state.pool, &slug)
        .await?
        .filter(|p| p.status == PublishStatus::Published || capability.is_admin)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))
}

/// POST /api/v1/posts - create a draft post. Admin only.
async fn create_post(
    State(state): State<AppState>,
    capability: Capability,
    Json(request): Json<NewPost>,
) -> Result<Json<Post>, AppError> {
    capability.require_admin()?;
    if request.slug.trim().is_empty() || request.title.trim().is_empty() {
        return Err(AppError::BadRequest("slug and title are required".to_string()));
    }

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM posts WHERE slug = $1 LIMIT 1")
        .bind(&request.slug)
        .fetch_optional(&state.pool)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(format!(
            "a post with slug '{}' already exists",
            request.slug
        )));
    }

    let post: Post = sqlx::query_as(
        r#"
        INSERT INTO posts (id, slug, title, summary, content, status, category, tags,
                           created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'draft', $6, $7, NOW(), NOW())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(request.slug.trim())
    .bind(request.title.trim())
    .bind(&request.summary)
    .bind(&request.content)
    .bind(&request.category)
    .bind(&request.tags)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(post))
}

/// Request body for updating a post. Absent fields are unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<PublishStatus>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// PUT /api/v1/posts/{id} - admin only.
async fn update_post(
    State(state): State<AppState>,
    capability: Capability,
    Path(id): Path<String>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    capability.require_admin()?;
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::BadRequest("post id is not a valid id".to_string()))?;

    let post: Option<Post> = sqlx::query_as(
        r#"
        UPDATE posts
        SET title = COALESCE($2, title),
            summary = COALESCE($3, summary),
            content = COALESCE($4, content),
            status = COALESCE($5, status),
            category = COALESCE($6, category),
            tags = COALESCE($7, tags),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&request.title)
    .bind(&request.summary)
    .bind(&request.content)
    .bind(request.status)
    .bind(&request.category)
    .bind(&request.tags)
    .fetch_optional(&state.pool)
    .await?;

    post.map(Json)
        .ok_or_else(|| AppError::NotFound("post not found".to_string()))
}

/// DELETE /api/v1/posts/{id} - admin only.
async fn delete_post(
    State(state): State<AppState>,
    capability: Capability,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    capability.require_admin()?;
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::BadRequest("post id is not a valid id".to_string()))?;

    let rows = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(AppError::NotFound("post not found".to_string()));
    }
    Ok(Json(json!({ "ok": true })))
}
