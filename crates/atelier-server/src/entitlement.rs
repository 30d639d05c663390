//! Pricing and entitlement resolution.
//!
//! Given a buyer email and a work, this module decides whether the buyer
//! may access the work's current deliverables and, when they own an older
//! version, what the upgrade costs. [`compute_entitlement`] is the single
//! deterministic decision function; it is pure over rows the caller has
//! already fetched, so the pricing rules are testable without a database.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{OrderStatus, Work, WorkVersion};

/// Label bucketing paid orders whose version reference was cleared
/// (the version artifact was deleted after purchase).
pub const LEGACY_VERSION_LABEL: &str = "legacy";

/// One PAID order joined with the version it was pinned to, if any.
#[derive(Debug, Clone, FromRow)]
pub struct PaidOrderRow {
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub order_created_at: DateTime<Utc>,
    pub version_id: Option<Uuid>,
    pub version: Option<String>,
    pub figma_url: Option<String>,
    pub delivery_url: Option<String>,
}

/// A previously purchased version in an upgrade response.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaidVersion {
    /// Version label, or `"legacy"` for cleared references.
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub figma_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_url: Option<String>,
}

/// Resolved entitlement for one (buyer, work) pair.
///
/// Serialized shape follows the public API contract: fields irrelevant to
/// the branch taken are omitted rather than nulled.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub purchased: bool,
    pub is_free: bool,
    pub current_price: BigDecimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_latest: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub figma_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_price: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_versions: Option<Vec<PaidVersion>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_version_id: Option<Uuid>,
}

/// Linear-credit upgrade pricing: the buyer's total historical spend on a
/// work is credited against the current price, floor-clamped at zero so
/// an over-spent history never turns into a refund.
pub fn upgrade_price(current_price: &BigDecimal, total_paid: &BigDecimal) -> BigDecimal {
    let difference = current_price - total_paid;
    if difference < BigDecimal::from(0) {
        BigDecimal::from(0)
    } else {
        difference
    }
}

/// Computes the entitlement for a buyer's PAID orders on a work.
///
/// `paid_orders` must be ordered newest-first (the fetch helpers below
/// guarantee this). Read-only over its inputs: calling it twice with the
/// same rows yields the same answer.
pub fn compute_entitlement(
    work: &Work,
    latest: Option<&WorkVersion>,
    paid_orders: &[PaidOrderRow],
) -> Entitlement {
    let current_price = latest
        .map(|v| v.price.clone())
        .or_else(|| work.price.clone())
        .unwrap_or_else(|| BigDecimal::from(0));
    let current_version = work
        .current_version
        .clone()
        .or_else(|| latest.map(|v| v.version.clone()));

    let Some(latest_order) = paid_orders.first() else {
        return Entitlement {
            purchased: false,
            is_free: work.is_free,
            current_price,
            current_version,
            has_latest: None,
            figma_url: None,
            delivery_url: None,
            paid_version: None,
            paid_amount: None,
            upgrade_price: None,
            paid_versions: None,
            latest_version_id: None,
        };
    };

    // A work with no versions has nothing newer to own; any paid order
    // grants full access.
    let has_latest = match latest {
        None => true,
        Some(latest_version) => latest_order.version_id == Some(latest_version.id),
    };

    if has_latest {
        let figma_url = latest
            .and_then(|v| v.figma_url.clone())
            .or_else(|| work.figma_url.clone());
        let delivery_url = latest
            .and_then(|v| v.delivery_url.clone())
            .or_else(|| work.delivery_url.clone());
        return Entitlement {
            purchased: true,
            is_free: work.is_free,
            current_price,
            current_version,
            has_latest: Some(true),
            figma_url,
            delivery_url,
            paid_version: latest_order.version.clone(),
            paid_amount: None,
            upgrade_price: None,
            paid_versions: None,
            latest_version_id: latest.map(|v| v.id),
        };
    }

    let total_paid = paid_orders
        .iter()
        .fold(BigDecimal::from(0), |acc, order| acc + &order.amount);

    // Dedup owned versions by label, newest-first; cleared references
    // collapse into a single legacy bucket.
    let mut seen = HashSet::new();
    let mut paid_versions = Vec::new();
    for order in paid_orders {
        let label = order
            .version
            .clone()
            .unwrap_or_else(|| LEGACY_VERSION_LABEL.to_string());
        if !seen.insert(label.clone()) {
            continue;
        }
        paid_versions.push(PaidVersion {
            version: label,
            version_id: order.version_id,
            figma_url: order.figma_url.clone(),
            delivery_url: order.delivery_url.clone(),
        });
    }

    Entitlement {
        purchased: true,
        is_free: work.is_free,
        upgrade_price: Some(upgrade_price(&current_price, &total_paid)),
        current_price,
        current_version,
        has_latest: Some(false),
        figma_url: None,
        delivery_url: None,
        paid_version: Some(
            latest_order
                .version
                .clone()
                .unwrap_or_else(|| LEGACY_VERSION_LABEL.to_string()),
        ),
        paid_amount: Some(total_paid),
        paid_versions: Some(paid_versions),
        latest_version_id: latest.map(|v| v.id),
    }
}

/// Fetches the most-recently-created version of a work, if any.
pub async fn latest_version(
    pool: &PgPool,
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
    .fetch_optional(pool)
    .await?;

    Ok(version)
}

/// Fetches a buyer's PAID orders for a work, newest first, each joined
/// with its pinned version's label and delivery links.
pub async fn paid_orders_for(
    pool: &PgPool,
    work_id: Uuid,
    buyer_email: &str,
) -> Result<Vec<PaidOrderRow>, AppError> {
    let rows: Vec<PaidOrderRow> = sqlx::query_as(
        r#"
        SELECT o.id AS order_id,
               o.amount,
               o.created_at AS order_created_at,
               o.version_id,
               v.version,
               v.figma_url,
               v.delivery_url
        FROM orders o
        LEFT JOIN work_versions v ON v.id = o.version_id
        WHERE o.work_id = $1 AND o.buyer_email = $2 AND o.status = $3
        ORDER BY o.created_at DESC
        "#,
    )
    .bind(work_id)
    .bind(buyer_email)
    .bind(OrderStatus::Paid)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
