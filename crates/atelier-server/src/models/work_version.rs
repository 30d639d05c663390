//! WorkVersion model: a priced, dated revision of a work's deliverable.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An ordered revision of a work.
///
/// The `(work_id, version)` pair is unique; the version with the greatest
/// `created_at` is the work's latest and its fields are mirrored onto the
/// owning [`super::Work`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkVersion {
    /// Unique identifier.
    pub id: Uuid,
    /// Owning work.
    pub work_id: Uuid,
    /// Version label, unique per work (e.g. "2.0").
    pub version: String,
    /// Price of this revision.
    pub price: BigDecimal,
    /// What changed in this revision.
    pub changelog: Option<String>,
    /// Figma source link; inherited from the prior version when omitted
    /// at creation.
    pub figma_url: Option<String>,
    /// Delivery (download) link; inherited like `figma_url`.
    pub delivery_url: Option<String>,
    /// Creation time; defines recency ordering.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new version of a work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkVersion {
    pub version: String,
    pub price: BigDecimal,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub figma_url: Option<String>,
    #[serde(default)]
    pub delivery_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_version_serializes_camel_case() {
        let version = WorkVersion {
            id: Uuid::new_v4(),
            work_id: Uuid::new_v4(),
            version: "1.1".to_string(),
            price: BigDecimal::from_str("50.00").unwrap(),
            changelog: Some("fixed kerning".to_string()),
            figma_url: None,
            delivery_url: Some("https://cdn.example/v1.1.zip".to_string()),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&version).unwrap();
        assert_eq!(json["version"], "1.1");
        assert_eq!(json["workId"], json["workId"]);
        assert!(json["deliveryUrl"].is_string());
        assert!(json["figmaUrl"].is_null());
    }

    #[test]
    fn test_new_version_optional_fields_default() {
        let json = r#"{"version": "2.0", "price": "80.00"}"#;
        let new_version: NewWorkVersion = serde_json::from_str(json).unwrap();
        assert_eq!(new_version.version, "2.0");
        assert_eq!(new_version.price, BigDecimal::from_str("80.00").unwrap());
        assert!(new_version.changelog.is_none());
        assert!(new_version.figma_url.is_none());
        assert!(new_version.delivery_url.is_none());
    }
}
