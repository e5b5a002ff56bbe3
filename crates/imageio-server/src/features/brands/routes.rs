//! Brand API routes
//!
//! - `POST /api/v1/brands` - Create a brand or category
//! - `GET /api/v1/brands` - List brands with item and image counts
//! - `GET /api/v1/brands/:id` - Get a brand with its items and images
//! - `DELETE /api/v1/brands/:id` - Delete a brand, its items and their stored files

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::FeatureState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;

use super::{
    commands::{CreateBrandCommand, CreateBrandError, DeleteBrandCommand, DeleteBrandError},
    queries::{GetBrandError, GetBrandQuery, ListBrandsError, ListBrandsQuery},
};

// ============================================================================
// Router Configuration
// ============================================================================

pub fn brands_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_brands).post(create_brand))
        .route("/:id", get(get_brand).delete(delete_brand))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Create a brand
///
/// # Endpoint
///
/// `POST /api/v1/brands`
///
/// # Request Body
///
/// ```json
/// { "name": "Acme", "kind": "brand" }
/// ```
///
/// # Response
///
/// - `201 Created` - Brand created
/// - `400 Bad Request` - Validation error
#[tracing::instrument(skip(state, command), fields(name = %command.name))]
async fn create_brand(
    State(state): State<FeatureState>,
    Json(command): Json<CreateBrandCommand>,
) -> Result<Response, BrandApiError> {
    let brand = super::commands::create::handle(state.store.as_ref(), command).await?;

    tracing::info!(brand_id = brand.id, kind = brand.kind.as_str(), "Brand created via API");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(brand))).into_response())
}

/// Delete a brand
///
/// # Endpoint
///
/// `DELETE /api/v1/brands/:id`
///
/// # Response
///
/// - `200 OK` - Brand deleted and its files reclaimed
/// - `404 Not Found` - Brand not found
/// - `409 Conflict` - An import for the brand is running
#[tracing::instrument(skip(state))]
async fn delete_brand(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
) -> Result<Response, BrandApiError> {
    if state.locks.is_active(id) {
        return Err(BrandApiError::ImportRunning(id));
    }

    let response = super::commands::delete::handle(
        state.store.as_ref(),
        &state.storage,
        DeleteBrandCommand { id },
    )
    .await?;

    tracing::info!(
        brand_id = id,
        files_removed = response.files_removed,
        "Brand deleted via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// Get a brand with its items
///
/// # Endpoint
///
/// `GET /api/v1/brands/:id`
#[tracing::instrument(skip(state))]
async fn get_brand(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
) -> Result<Response, BrandApiError> {
    let response = super::queries::get::handle(state.store.as_ref(), GetBrandQuery { id }).await?;

    tracing::debug!(brand_id = id, items = response.items.len(), "Brand retrieved via API");

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// List brands
///
/// # Endpoint
///
/// `GET /api/v1/brands?kind=category`
#[tracing::instrument(skip(state, query), fields(kind = ?query.kind))]
async fn list_brands(
    State(state): State<FeatureState>,
    Query(query): Query<ListBrandsQuery>,
) -> Result<Response, BrandApiError> {
    let brands = super::queries::list::handle(state.store.as_ref(), query).await?;

    tracing::debug!(count = brands.len(), "Brands listed via API");

    let meta = json!({ "total": brands.len() });
    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(brands, meta))).into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Unified error type for brand API endpoints
#[derive(Debug)]
enum BrandApiError {
    CreateError(CreateBrandError),
    DeleteError(DeleteBrandError),
    GetError(GetBrandError),
    ListError(ListBrandsError),
    ImportRunning(i64),
}

impl From<CreateBrandError> for BrandApiError {
    fn from(err: CreateBrandError) -> Self {
        Self::CreateError(err)
    }
}

impl From<DeleteBrandError> for BrandApiError {
    fn from(err: DeleteBrandError) -> Self {
        Self::DeleteError(err)
    }
}

impl From<GetBrandError> for BrandApiError {
    fn from(err: GetBrandError) -> Self {
        Self::GetError(err)
    }
}

impl From<ListBrandsError> for BrandApiError {
    fn from(err: ListBrandsError) -> Self {
        Self::ListError(err)
    }
}

impl IntoResponse for BrandApiError {
    fn into_response(self) -> Response {
        match self {
            BrandApiError::CreateError(CreateBrandError::NameRequired)
            | BrandApiError::CreateError(CreateBrandError::NameLength)
            | BrandApiError::DeleteError(DeleteBrandError::InvalidId)
            | BrandApiError::GetError(GetBrandError::InvalidId) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            BrandApiError::DeleteError(DeleteBrandError::NotFound(_))
            | BrandApiError::GetError(GetBrandError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            BrandApiError::ImportRunning(_) => {
                let error = ErrorResponse::new("CONFLICT", self.to_string());
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            BrandApiError::CreateError(CreateBrandError::Store(_))
            | BrandApiError::DeleteError(DeleteBrandError::Store(_))
            | BrandApiError::GetError(GetBrandError::Store(_))
            | BrandApiError::ListError(ListBrandsError::Store(_)) => {
                tracing::error!("Store error in brand API: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for BrandApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateError(e) => write!(f, "{}", e),
            Self::DeleteError(e) => write!(f, "{}", e),
            Self::GetError(e) => write!(f, "{}", e),
            Self::ListError(e) => write!(f, "{}", e),
            Self::ImportRunning(id) => write!(f, "An import for brand {} is running", id),
        }
    }
}
