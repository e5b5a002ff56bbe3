//! Catalog domain models
//!
//! A [`Brand`] (a brand or a category) owns [`Item`]s, and each item owns up to five
//! [`Image`] slots. Images start `pending` and are finalized exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Whether a parent entity is a primary brand or a grouping category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrandKind {
    #[default]
    Brand,
    Category,
}

impl BrandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BrandKind::Brand => "brand",
            BrandKind::Category => "category",
        }
    }
}

impl TryFrom<String> for BrandKind {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "brand" => Ok(BrandKind::Brand),
            "category" => Ok(BrandKind::Category),
            _ => Err(ParseEnumError {
                kind: "brand kind",
                value,
            }),
        }
    }
}

/// Lifecycle of an image slot: `pending` moves once to `downloaded` or `failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Pending,
    Downloaded,
    Failed,
}

impl ImageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageStatus::Pending => "pending",
            ImageStatus::Downloaded => "downloaded",
            ImageStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ImageStatus::Pending)
    }
}

impl TryFrom<String> for ImageStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(ImageStatus::Pending),
            "downloaded" => Ok(ImageStatus::Downloaded),
            "failed" => Ok(ImageStatus::Failed),
            _ => Err(ParseEnumError {
                kind: "image status",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub kind: BrandKind,
    pub created_at: DateTime<Utc>,
}

/// Brand listing row with aggregate counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BrandSummary {
    pub id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub kind: BrandKind,
    pub created_at: DateTime<Utc>,
    pub item_count: i64,
    /// Images in `downloaded` status
    pub image_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: i64,
    pub brand_id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Image {
    pub id: i64,
    pub item_id: i64,
    /// Slot number, `1..=5`
    pub position: i32,
    pub original_url: Option<String>,
    /// `{brand_id}/{item_id}/{filename}`, relative to the storage root
    pub storage_path: Option<String>,
    pub public_filename: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ImageStatus,
    pub created_at: DateTime<Utc>,
}

/// An item together with its image slots ordered by position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemWithImages {
    #[serde(flatten)]
    pub item: Item,
    pub images: Vec<Image>,
}

/// A downloaded image joined with its item, as consumed by exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DownloadedImage {
    pub image_id: i64,
    pub item_id: i64,
    pub item_title: String,
    pub position: i32,
    pub storage_path: String,
    pub public_filename: String,
}

/// Ordering of items within a brand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOrder {
    /// Most recently created first, as shown on the brand page
    Newest,
    /// Alphabetical by title, as written to exports
    Title,
}
