//! Order routes: checkout, payment creation, gateway notifications and
//! admin batch operations.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use bigdecimal::BigDecimal;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::Capability;
use crate::error::AppError;
use crate::events::{PlatformEvent, ORDER_PAID};
use crate::models::{NewOrder, Order, OrderStatus, Work, WorkVersion};
use crate::state::AppState;

/// Random bytes in an order number suffix.
const ORDER_NO_SUFFIX_BYTES: usize = 4;

/// Default and maximum page sizes for the admin listing.
const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 500;

/// Creates the orders router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_orders)
                .post(create_order)
                .patch(batch_update_status)
                .delete(batch_delete),
        )
        .route("/status", get(order_status))
        .route("/pay", post(create_payment))
        .route("/notify", post(gateway_notify))
        .route("/simulate-pay", post(simulate_pay))
}

/// Generates an external-facing order number, e.g. `ATL-20260807-9F2C11AB`.
fn generate_order_no() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; ORDER_NO_SUFFIX_BYTES] = rng.gen();
    format!(
        "ATL-{}-{}",
        chrono::Utc::now().format("%Y%m%d"),
        hex::encode_upper(bytes)
    )
}

/// Amount charged for an order: the pinned version's price, else the
/// work's current price, zero for free works.
fn order_amount(work: &Work, version: Option<&WorkVersion>) -> BigDecimal {
    if work.is_free {
        return BigDecimal::from(0);
    }
    version
        .map(|v| v.price.clone())
        .or_else(|| work.price.clone())
        .unwrap_or_else(|| BigDecimal::from(0))
}

/// Loads an order by its external order number.
async fn find_order(pool: &PgPool, order_no: &str) -> Result<Option<Order>, AppError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        SELECT id, order_no, work_id, version_id, buyer_email, amount, status,
               paid_at, gateway_txn_id, created_at
        FROM orders
        WHERE order_no = $1
        "#,
    )
    .bind(order_no)
    .fetch_optional(pool)
    .await?;
    Ok(order)
}

// ===== Checkout creation =====

/// Request body for creating an order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub work_id: Uuid,
    #[serde(default)]
    pub version_id: Option<Uuid>,
    pub email: String,
}

/// POST /api/v1/orders
///
/// Creates a PENDING order for a published work. The amount is fixed at
/// creation time from the pinned version (or the work's current price)
/// and never changes afterwards.
async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let email = request.email.trim();
    if !email.contains('@') {
        return Err(AppError::BadRequest("email is not valid".to_string()));
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
    .bind(request.work_id)
    .fetch_optional(&state.pool)
    .await?;
    let work = work
        .filter(|w| w.is_published())
        .ok_or_else(|| AppError::BadRequest("work does not exist or is not published".to_string()))?;

    let version = match request.version_id {
        None => None,
        Some(version_id) => {
            let version: Option<WorkVersion> = sqlx::query_as(
                r#"
                SELECT id, work_id, version, price, changelog, figma_url, delivery_url, created_at
                FROM work_versions
                WHERE id = $1 AND work_id = $2
                "#,
            )
            .bind(version_id)
            .bind(work.id)
            .fetch_optional(&state.pool)
            .await?;
            Some(version.ok_or_else(|| {
                AppError::BadRequest("version does not belong to this work".to_string())
            })?)
        }
    };

    let new_order = NewOrder {
        work_id: work.id,
        version_id: version.as_ref().map(|v| v.id),
        buyer_email: email.to_string(),
        amount: order_amount(&work, version.as_ref()),
    };

    let order: Order = sqlx::query_as(
        r#"
        INSERT INTO orders (id, order_no, work_id, version_id, buyer_email, amount,
                            status, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, 'pending', NOW())
        RETURNING id, order_no, work_id, version_id, buyer_email, amount, status,
                  paid_at, gateway_txn_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(generate_order_no())
    .bind(new_order.work_id)
    .bind(new_order.version_id)
    .bind(&new_order.buyer_email)
    .bind(&new_order.amount)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(order))
}

// ===== Public status poll =====

/// Query parameters for the status poll.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    #[serde(default)]
    pub order_no: Option<String>,
}

/// GET /api/v1/orders/status?orderNo=
///
/// Polled by the checkout page while the buyer scans the QR code. The
/// buyer email is masked so the order number alone never leaks a full
/// address.
async fn order_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let order_no = query
        .order_no
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("orderNo is required".to_string()))?;

    let rate = state.limiter.check(order_no);
    if rate.exceeded {
        return Err(AppError::TooManyRequests {
            message: "Too many status checks; try again shortly".to_string(),
            retry_after: rate.retry_after,
        });
    }

    let order = find_order(&state.pool, order_no)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

    Ok(Json(json!({
        "status": order.status,
        "emailHint": order.email_hint(),
    })))
}

// ===== Payment creation =====

/// Request body carrying just an order number.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNoRequest {
    pub order_no: String,
}

/// POST /api/v1/orders/pay
///
/// Creates a scan-to-pay request at the gateway for a pending order and
/// returns the payment URI plus a rendered QR image of it.
async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<OrderNoRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let order_no = request.order_no.trim();
    if order_no.is_empty() {
        return Err(AppError::BadRequest("orderNo is required".to_string()));
    }

    let rate = state.limiter.check(&format!("pay:{}", order_no));
    if rate.exceeded {
        return Err(AppError::TooManyRequests {
            message: "Too many payment attempts; try again shortly".to_string(),
            retry_after: rate.retry_after,
        });
    }

    let order = find_order(&state.pool, order_no)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;
    if !order.is_pending() {
        return Err(AppError::BadRequest("order is not pending".to_string()));
    }
    if order.amount <= BigDecimal::from(0) {
        return Err(AppError::BadRequest(
            "order amount is zero; nothing to pay".to_string(),
        ));
    }

    let pay = state
        .pay
        .as_ref()
        .ok_or_else(|| AppError::Internal("payment gateway is not configured".to_string()))?;

    let (title,): (String,) = sqlx::query_as("SELECT title FROM works WHERE id = $1")
        .bind(order.work_id)
        .fetch_one(&state.pool)
        .await?;

    let code_url = pay
        .create_native_order(&order.order_no, &order.amount.to_string(), &title)
        .await
        .map_err(|e| AppError::Gateway(e.to_string()))?;

    let qr_data_url = atelier_pay::qr_svg_data_url(&code_url)
        .map_err(|e| AppError::Internal(format!("Failed to render QR code: {}", e)))?;

    Ok(Json(json!({
        "codeUrl": code_url,
        "qrDataUrl": qr_data_url,
    })))
}

// ===== MarkPaid =====

/// Outcome of a mark-paid attempt.
enum MarkPaidOutcome {
    /// This call performed the PENDING -> PAID transition.
    Transitioned(Order),
    /// The order was already paid before this call.
    AlreadyPaid(Order),
}

/// Transitions an order to paid with a storage-level compare-and-swap.
///
/// Only the caller that observes PENDING performs the transition, so two
/// concurrent confirmations (duplicate gateway notification plus an admin
/// action) produce exactly one transition and one notification.
async fn mark_order_paid(
    pool: &PgPool,
    order_no: &str,
    gateway_txn_id: Option<&str>,
) -> Result<MarkPaidOutcome, AppError> {
    let updated: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders
        SET status = 'paid',
            paid_at = NOW(),
            gateway_txn_id = COALESCE($2, gateway_txn_id)
        WHERE order_no = $1 AND status = 'pending'
        RETURNING id, order_no, work_id, version_id, buyer_email, amount, status,
                  paid_at, gateway_txn_id, created_at
        "#,
    )
    .bind(order_no)
    .bind(gateway_txn_id)
    .fetch_optional(pool)
    .await?;

    if let Some(order) = updated {
        return Ok(MarkPaidOutcome::Transitioned(order));
    }

    match find_order(pool, order_no).await? {
        None => Err(AppError::NotFound("order not found".to_string())),
        Some(order) if order.is_paid() => Ok(MarkPaidOutcome::AlreadyPaid(order)),
        Some(_) => Err(AppError::Conflict("order is not pending".to_string())),
    }
}

/// Delivery links resolved for a paid order: the pinned version's fields
/// with the work's own fields as fallback.
struct DeliveryLinks {
    work_title: String,
    version: Option<String>,
    figma_url: Option<String>,
    delivery_url: Option<String>,
}

async fn resolve_delivery_links(pool: &PgPool, order: &Order) -> Result<DeliveryLinks, AppError> {
    let (work_title, work_figma, work_delivery, work_version): (
        String,
        Option<String>,
        Option<String>,
        Option<String>,
    ) = sqlx::query_as(
        "SELECT title, figma_url, delivery_url, current_version FROM works WHERE id = $1",
    )
    .bind(order.work_id)
    .fetch_one(pool)
    .await?;

    let version: Option<WorkVersion> = match order.version_id {
        None => None,
        Some(version_id) => {
            sqlx::query_as(
                r#"
                SELECT id, work_id, version, price, changelog, figma_url, delivery_url, created_at
                FROM work_versions
                WHERE id = $1
                "#,
            )
            .bind(version_id)
            .fetch_optional(pool)
            .await?
        }
    };

    Ok(DeliveryLinks {
        work_title,
        version: version
            .as_ref()
            .map(|v| v.version.clone())
            .or(work_version),
        figma_url: version
            .as_ref()
            .and_then(|v| v.figma_url.clone())
            .or(work_figma),
        delivery_url: version
            .as_ref()
            .and_then(|v| v.delivery_url.clone())
            .or(work_delivery),
    })
}

/// Publishes the order.paid event consumed by the notification worker.
fn publish_paid_event(state: &AppState, order: &Order, links: &DeliveryLinks) {
    state.events.publish(
        PlatformEvent::new(ORDER_PAID).with_payload(json!({
            "orderNo": order.order_no,
            "buyerEmail": order.buyer_email,
            "workTitle": links.work_title,
            "version": links.version,
            "figmaUrl": links.figma_url,
            "deliveryUrl": links.delivery_url,
        })),
    );
}

/// POST /api/v1/orders/notify
///
/// Asynchronous payment notification from the gateway. The signature is
/// verified before anything else; a repeated notification for an
/// already-paid order is acknowledged without a second transition or a
/// second delivery email.
async fn gateway_notify(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pay_config = state
        .config
        .pay
        .as_ref()
        .ok_or_else(|| AppError::Internal("payment gateway is not configured".to_string()))?;

    let payment = atelier_pay::verify_notification(&payload, &pay_config.api_key)
        .map_err(|e| AppError::BadRequest(format!("notification rejected: {}", e)))?;

    let order = find_order(&state.pool, &payment.order_no)
        .await?
        .ok_or_else(|| AppError::NotFound("order not found".to_string()))?;

    // The gateway-reported amount must reconcile with what we charged.
    let reported = BigDecimal::from_str(&payment.amount)
        .map_err(|_| AppError::BadRequest("notification amount is not a number".to_string()))?;
    if reported != order.amount {
        tracing::warn!(
            order_no = %order.order_no,
            reported = %reported,
            expected = %order.amount,
            "Notification amount mismatch"
        );
        return Err(AppError::BadRequest(
            "notification amount does not match order".to_string(),
        ));
    }

    match mark_order_paid(&state.pool, &payment.order_no, Some(&payment.transaction_id)).await? {
        MarkPaidOutcome::Transitioned(order) => {
            let links = resolve_delivery_links(&state.pool, &order).await?;
            publish_paid_event(&state, &order, &links);
            Ok(Json(json!({ "returnCode": "SUCCESS" })))
        }
        MarkPaidOutcome::AlreadyPaid(_) => Ok(Json(json!({ "returnCode": "SUCCESS" }))),
    }
}

/// POST /api/v1/orders/simulate-pay
///
/// Admin shortcut that confirms an order without the gateway. Disabled
/// in production unless explicitly enabled by environment toggle.
async fn simulate_pay(
    State(state): State<AppState>,
    capability: Capability,
    Json(request): Json<OrderNoRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    capability.require_admin()?;
    if !state.config.allow_simulate_pay {
        return Err(AppError::Forbidden("simulate-pay is disabled".to_string()));
    }

    match mark_order_paid(&state.pool, request.order_no.trim(), None).await? {
        MarkPaidOutcome::Transitioned(order) => {
            let links = resolve_delivery_links(&state.pool, &order).await?;
            publish_paid_event(&state, &order, &links);
            Ok(Json(json!({
                "ok": true,
                "orderNo": order.order_no,
                "version": links.version,
                "figmaUrl": links.figma_url,
                "deliveryUrl": links.delivery_url,
            })))
        }
        MarkPaidOutcome::AlreadyPaid(_) => {
            Err(AppError::Conflict("order is not pending".to_string()))
        }
    }
}

// ===== Admin listing and batch operations =====

/// Query parameters for the admin order listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// GET /api/v1/orders - admin listing, newest first.
async fn list_orders(
    State(state): State<AppState>,
    capability: Capability,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    capability.require_admin()?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let orders: Vec<Order> = sqlx::query_as(
        r#"
        SELECT id, order_no, work_id, version_id, buyer_email, amount, status,
               paid_at, gateway_txn_id, created_at
        FROM orders
        WHERE $1::order_status IS NULL OR status = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(query.status)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(orders))
}

/// Request body for the batch status update.
#[derive(Debug, Deserialize)]
pub struct BatchStatusRequest {
    pub ids: Vec<Uuid>,
    pub status: OrderStatus,
}

/// Response for batch operations.
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub ok: bool,
    pub affected: u64,
}

/// Validates the target status of a batch update.
fn validate_batch_status(status: OrderStatus) -> Result<(), AppError> {
    match status {
        OrderStatus::Paid | OrderStatus::Cancelled | OrderStatus::Refunded => Ok(()),
        OrderStatus::Pending => Err(AppError::BadRequest(
            "target status must be paid, cancelled or refunded".to_string(),
        )),
    }
}

/// PATCH /api/v1/orders
///
/// Administrative override: forces a status onto every listed order
/// regardless of its current state. Best-effort over the id set; unknown
/// ids are skipped silently. `paid_at` is set when the target is paid
/// and never reset afterwards.
async fn batch_update_status(
    State(state): State<AppState>,
    capability: Capability,
    Json(request): Json<BatchStatusRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    capability.require_admin()?;
    if request.ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".to_string()));
    }
    validate_batch_status(request.status)?;

    let affected = sqlx::query(
        r#"
        UPDATE orders
        SET status = $1,
            paid_at = CASE
                WHEN $1 = 'paid'::order_status THEN COALESCE(paid_at, NOW())
                ELSE paid_at
            END
        WHERE id = ANY($2)
        "#,
    )
    .bind(request.status)
    .bind(&request.ids)
    .execute(&state.pool)
    .await?
    .rows_affected();

    Ok(Json(BatchResponse { ok: true, affected }))
}

/// Request body for batch deletion.
#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    pub ids: Vec<Uuid>,
}

/// DELETE /api/v1/orders
///
/// Deletes orders outright. Already-delivered access is not revoked;
/// the rows simply vanish from history.
async fn batch_delete(
    State(state): State<AppState>,
    capability: Capability,
    Json(request): Json<BatchDeleteRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    capability.require_admin()?;
    if request.ids.is_empty() {
        return Err(AppError::BadRequest("ids must not be empty".to_string()));
    }

    let affected = sqlx::query("DELETE FROM orders WHERE id = ANY($1)")
        .bind(&request.ids)
        .execute(&state.pool)
        .await?
        .rows_affected();

    Ok(Json(BatchResponse { ok: true, affected }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PublishStatus, WorkType};
    use chrono::Utc;

    fn decimal(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn sample_work(is_free: bool, price: Option<&str>) -> Work {
        let now = Utc::now();
        Work {
            id: Uuid::new_v4(),
            slug: "poster-pack".to_string(),
            title: "Poster Pack".to_string(),
            work_type: WorkType::Design,
            status: PublishStatus::Published,
            is_free,
            price: price.map(decimal),
            current_version: None,
            figma_url: None,
            delivery_url: None,
            category: None,
            tags: None,
            description: None,
            cover_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_version(work_id: Uuid, price: &str) -> WorkVersion {
        WorkVersion {
            id: Uuid::new_v4(),
            work_id,
            version: "2.0".to_string(),
            price: decimal(price),
            changelog: None,
            figma_url: None,
            delivery_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_no_format() {
        let order_no = generate_order_no();
        let parts: Vec<&str> = order_no.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ATL");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), ORDER_NO_SUFFIX_BYTES * 2);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_order_nos_are_unique_enough() {
        let a = generate_order_no();
        let b = generate_order_no();
        assert_ne!(a, b);
    }

    #[test]
    fn test_order_amount_uses_version_price() {
        let work = sample_work(false, Some("50"));
        let version = sample_version(work.id, "80.00");
        assert_eq!(order_amount(&work, Some(&version)), decimal("80.00"));
    }

    #[test]
    fn test_order_amount_falls_back_to_work_price() {
        let work = sample_work(false, Some("50"));
        assert_eq!(order_amount(&work, None), decimal("50"));
    }

    #[test]
    fn test_order_amount_free_work_is_zero() {
        let work = sample_work(true, Some("50"));
        let version = sample_version(work.id, "80.00");
        assert_eq!(order_amount(&work, Some(&version)), decimal("0"));
    }

    #[test]
    fn test_order_amount_unpriced_work_is_zero() {
        let work = sample_work(false, None);
        assert_eq!(order_amount(&work, None), decimal("0"));
    }

    #[test]
    fn test_validate_batch_status_rejects_pending() {
        assert!(validate_batch_status(OrderStatus::Pending).is_err());
        assert!(validate_batch_status(OrderStatus::Paid).is_ok());
        assert!(validate_batch_status(OrderStatus::Cancelled).is_ok());
        assert!(validate_batch_status(OrderStatus::Refunded).is_ok());
    }
}
