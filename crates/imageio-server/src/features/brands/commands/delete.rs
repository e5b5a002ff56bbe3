use serde::{Deserialize, Serialize};

use crate::db::{CatalogStore, StoreError};
use crate::features::shared::validate_id;
use crate::storage::MediaStorage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBrandCommand {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBrandResponse {
    pub id: i64,
    pub deleted: bool,
    pub files_removed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteBrandError {
    #[error("Brand id must be a positive integer")]
    InvalidId,
    #[error("Brand {0} not found")]
    NotFound(i64),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DeleteBrandCommand {
    pub fn validate(&self) -> Result<(), DeleteBrandError> {
        if !validate_id(self.id) {
            return Err(DeleteBrandError::InvalidId);
        }
        Ok(())
    }
}

/// Delete the brand's records, then reclaim its files
#[tracing::instrument(skip(store, storage))]
pub async fn handle(
    store: &dyn CatalogStore,
    storage: &MediaStorage,
    command: DeleteBrandCommand,
) -> Result<DeleteBrandResponse, DeleteBrandError> {
    command.validate()?;

    let paths = store
        .delete_brand(command.id)
        .await?
        .ok_or(DeleteBrandError::NotFound(command.id))?;

    let reclaimed = storage.reclaim(&paths).await;
    if let Err(e) = storage.remove_brand_dir(command.id).await {
        tracing::warn!(brand_id = command.id, error = %e, "Brand directory not removed");
    }

    Ok(DeleteBrandResponse {
        id: command.id,
        deleted: true,
        files_removed: reclaimed.removed,
    })
}
