//! Order model: a purchase transaction for one work.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Possible states of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Checkout initiated, payment not confirmed
    Pending,
    /// Payment confirmed
    Paid,
    /// Abandoned or cancelled before payment
    Cancelled,
    /// Paid and subsequently refunded
    Refunded,
}

/// A purchase transaction.
///
/// `buyer_email` is the entitlement key: purchases are tied to an email
/// address, not an authenticated account. `version_id` is null for
/// unversioned purchases and is cleared (not cascaded) when the version
/// it pointed at is deleted, so purchase history outlives version
/// cleanup. `paid_at` is set exactly when the status becomes paid and is
/// never reset afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique identifier.
    pub id: Uuid,
    /// External-facing order number.
    pub order_no: String,
    /// The purchased work.
    pub work_id: Uuid,
    /// The specific version purchased, when pinned.
    pub version_id: Option<Uuid>,
    /// Buyer's email address.
    pub buyer_email: String,
    /// Amount paid; immutable once set.
    pub amount: BigDecimal,
    /// Current order status.
    pub status: OrderStatus,
    /// When payment was confirmed.
    pub paid_at: Option<DateTime<Utc>>,
    /// Gateway-side transaction id, once paid through the gateway.
    pub gateway_txn_id: Option<String>,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Check if the order is awaiting payment.
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Check if the order has been paid.
    pub fn is_paid(&self) -> bool {
        self.status == OrderStatus::Paid
    }

    /// Masked buyer email safe for the public status endpoint.
    pub fn email_hint(&self) -> String {
        mask_email(&self.buyer_email)
    }
}

/// Data required to create a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub work_id: Uuid,
    pub version_id: Option<Uuid>,
    pub buyer_email: String,
    pub amount: BigDecimal,
}

/// Masks an email as first-two-characters + `***` + domain.
///
/// Local parts shorter than two characters are kept whole; inputs without
/// an `@` are masked entirely.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let visible: String = local.chars().take(2).collect();
            format!("{}***@{}", visible, domain)
        }
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample_order(status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            order_no: "ATL-20260101-DEADBEEF".to_string(),
            work_id: Uuid::new_v4(),
            version_id: None,
            buyer_email: "alice@example.com".to_string(),
            amount: BigDecimal::from_str("80.00").unwrap(),
            status,
            paid_at: None,
            gateway_txn_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_status_serialization() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Paid).unwrap(),
            "\"paid\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Refunded).unwrap(),
            "\"refunded\""
        );
    }

    #[test]
    fn test_order_status_deserialization() {
        assert_eq!(
            serde_json::from_str::<OrderStatus>("\"refunded\"").unwrap(),
            OrderStatus::Refunded
        );
    }

    #[test]
    fn test_status_helpers() {
        assert!(sample_order(OrderStatus::Pending).is_pending());
        assert!(!sample_order(OrderStatus::Pending).is_paid());
        assert!(sample_order(OrderStatus::Paid).is_paid());
        assert!(!sample_order(OrderStatus::Cancelled).is_paid());
    }

    #[test]
    fn test_mask_email_standard() {
        assert_eq!(mask_email("alice@example.com"), "al***@example.com");
    }

    #[test]
    fn test_mask_email_short_local_part() {
        assert_eq!(mask_email("a@example.com"), "a***@example.com");
    }

    #[test]
    fn test_mask_email_two_char_local_part() {
        assert_eq!(mask_email("ab@example.com"), "ab***@example.com");
    }

    #[test]
    fn test_mask_email_without_at() {
        assert_eq!(mask_email("not-an-email"), "***");
    }

    #[test]
    fn test_order_serializes_camel_case() {
        let order = sample_order(OrderStatus::Pending);
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["orderNo"], "ATL-20260101-DEADBEEF");
        assert_eq!(json["buyerEmail"], "alice@example.com");
        assert_eq!(json["status"], "pending");
        assert!(json["paidAt"].is_null());
    }
}
