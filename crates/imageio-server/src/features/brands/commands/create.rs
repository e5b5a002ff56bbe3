use serde::{Deserialize, Serialize};

use crate::db::{CatalogStore, StoreError};
use crate::features::shared::{validate_name, NameValidationError};
use crate::models::{Brand, BrandKind};

/// Longest brand name accepted
pub const MAX_BRAND_NAME_LEN: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBrandCommand {
    pub name: String,
    #[serde(default)]
    pub kind: BrandKind,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateBrandError {
    #[error("Name is required and cannot be empty")]
    NameRequired,
    #[error("Name must be at most {MAX_BRAND_NAME_LEN} characters")]
    NameLength,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CreateBrandCommand {
    pub fn validate(&self) -> Result<(), CreateBrandError> {
        validate_name(&self.name, MAX_BRAND_NAME_LEN).map_err(|e| match e {
            NameValidationError::Required => CreateBrandError::NameRequired,
            NameValidationError::TooLong { .. } => CreateBrandError::NameLength,
        })
    }
}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: &dyn CatalogStore,
    command: CreateBrandCommand,
) -> Result<Brand, CreateBrandError> {
    command.validate()?;

    let brand = store.create_brand(command.name.trim(), command.kind).await?;
    Ok(brand)
}
