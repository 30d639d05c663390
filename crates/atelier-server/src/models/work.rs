//! Work model: a purchasable or free creative asset.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Kind of creative work offered by the studio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "work_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WorkType {
    /// Design assets (posters, UI kits, source files)
    Design,
    /// Development projects (templates, code drops)
    Development,
}

/// Publication state shared by works and posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "publish_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    /// Visible only to admins
    Draft,
    /// Publicly listed
    Published,
}

/// A creative work.
///
/// `price`, `current_version`, `figma_url` and `delivery_url` mirror the
/// most-recently-created [`super::WorkVersion`] (null when no version
/// exists). Only the version-management operations write these fields.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    /// Unique identifier.
    pub id: Uuid,
    /// URL slug, unique across works.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Design or development.
    pub work_type: WorkType,
    /// Draft or published.
    pub status: PublishStatus,
    /// Whether the work is free to download.
    pub is_free: bool,
    /// Mirror of the latest version's price.
    pub price: Option<BigDecimal>,
    /// Mirror of the latest version's label.
    pub current_version: Option<String>,
    /// Mirror of the latest version's Figma source link.
    pub figma_url: Option<String>,
    /// Mirror of the latest version's delivery link.
    pub delivery_url: Option<String>,
    /// Optional category name.
    pub category: Option<String>,
    /// Optional free-form tags.
    pub tags: Option<Vec<String>>,
    /// Long-form description.
    pub description: Option<String>,
    /// Cover image URL.
    pub cover_url: Option<String>,
    /// When the work was created.
    pub created_at: DateTime<Utc>,
    /// When the work was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Work {
    /// Check if the work is publicly visible.
    pub fn is_published(&self) -> bool {
        self.status == PublishStatus::Published
    }
}

/// Data required to create a new work (created as a draft).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWork {
    pub slug: String,
    pub title: String,
    pub work_type: WorkType,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
}
