//! API request and response types
//!
//! Mirror the server's JSON envelopes.

use serde::{Deserialize, Serialize};

/// Successful API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// Failed API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Request to create a brand or category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBrandRequest {
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub created_at: String,
}

/// A brand with its item and downloaded-image counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandSummary {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub item_count: i64,
    pub image_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedBrand {
    pub id: i64,
    pub deleted: bool,
    pub files_removed: usize,
}
