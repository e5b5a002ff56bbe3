//! Item API routes
//!
//! - `DELETE /api/v1/items/:id` - Delete an item and its stored files

use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::FeatureState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::delete,
    Json, Router,
};

use super::commands::{DeleteItemCommand, DeleteItemError};

pub fn items_routes() -> Router<FeatureState> {
    Router::new().route("/:id", delete(delete_item))
}

/// Delete an item
///
/// # Response
///
/// - `200 OK` - Item deleted and its files reclaimed
/// - `404 Not Found` - Item not found
/// - `409 Conflict` - An import for the item's brand is running
#[tracing::instrument(skip(state))]
async fn delete_item(
    State(state): State<FeatureState>,
    Path(id): Path<i64>,
) -> Result<Response, ItemApiError> {
    if let Some(item) = state.store.get_item(id).await.map_err(DeleteItemError::from)? {
        if state.locks.is_active(item.brand_id) {
            return Err(ItemApiError::ImportRunning(item.brand_id));
        }
    }

    let response = super::commands::delete::handle(
        state.store.as_ref(),
        &state.storage,
        DeleteItemCommand { id },
    )
    .await?;

    tracing::info!(
        item_id = id,
        brand_id = response.brand_id,
        files_removed = response.files_removed,
        "Item deleted via API"
    );

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[derive(Debug)]
enum ItemApiError {
    DeleteError(DeleteItemError),
    ImportRunning(i64),
}

impl From<DeleteItemError> for ItemApiError {
    fn from(err: DeleteItemError) -> Self {
        Self::DeleteError(err)
    }
}

impl IntoResponse for ItemApiError {
    fn into_response(self) -> Response {
        match self {
            ItemApiError::DeleteError(DeleteItemError::InvalidId) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            ItemApiError::DeleteError(DeleteItemError::NotFound(_)) => {
                let error = ErrorResponse::new("NOT_FOUND", self.to_string());
                (StatusCode::NOT_FOUND, Json(error)).into_response()
            },
            ItemApiError::ImportRunning(_) => {
                let error = ErrorResponse::new("CONFLICT", self.to_string());
                (StatusCode::CONFLICT, Json(error)).into_response()
            },
            ItemApiError::DeleteError(DeleteItemError::Store(_)) => {
                tracing::error!("Store error during item deletion: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for ItemApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeleteError(e) => write!(f, "{}", e),
            Self::ImportRunning(brand_id) => {
                write!(f, "An import for brand {} is running", brand_id)
            },
        }
    }
}
