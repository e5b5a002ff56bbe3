use serde::{Deserialize, Serialize};

use crate::db::{CatalogStore, StoreError};
use crate::features::shared::validate_id;
use crate::models::{Brand, ItemOrder, ItemWithImages};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBrandQuery {
    pub id: i64,
}

/// A brand with its items, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBrandResponse {
    #[serde(flatten)]
    pub brand: Brand,
    pub items: Vec<ItemWithImages>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetBrandError {
    #[error("Brand id must be a positive integer")]
    InvalidId,
    #[error("Brand {0} not found")]
    NotFound(i64),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl GetBrandQuery {
    pub fn validate(&self) -> Result<(), GetBrandError> {
        if !validate_id(self.id) {
            return Err(GetBrandError::InvalidId);
        }
        Ok(())
    }
}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: &dyn CatalogStore,
    query: GetBrandQuery,
) -> Result<GetBrandResponse, GetBrandError> {
    query.validate()?;

    let brand = store
        .get_brand(query.id)
        .await?
        .ok_or(GetBrandError::NotFound(query.id))?;
    let items = store.list_items(brand.id, ItemOrder::Newest).await?;

    Ok(GetBrandResponse { brand, items })
}
