use serde::{Deserialize, Serialize};

use crate::db::{CatalogStore, StoreError};
use crate::features::shared::validate_id;
use crate::storage::MediaStorage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteItemCommand {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteItemResponse {
    pub id: i64,
    pub brand_id: i64,
    pub deleted: bool,
    pub files_removed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteItemError {
    #[error("Item id must be a positive integer")]
    InvalidId,
    #[error("Item {0} not found")]
    NotFound(i64),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DeleteItemCommand {
    pub fn validate(&self) -> Result<(), DeleteItemError> {
        if !validate_id(self.id) {
            return Err(DeleteItemError::InvalidId);
        }
        Ok(())
    }
}

/// Delete the item's records, then reclaim its files
#[tracing::instrument(skip(store, storage))]
pub async fn handle(
    store: &dyn CatalogStore,
    storage: &MediaStorage,
    command: DeleteItemCommand,
) -> Result<DeleteItemResponse, DeleteItemError> {
    command.validate()?;

    let deleted = store
        .delete_item(command.id)
        .await?
        .ok_or(DeleteItemError::NotFound(command.id))?;

    let reclaimed = storage.reclaim(&deleted.storage_paths).await;

    Ok(DeleteItemResponse {
        id: command.id,
        brand_id: deleted.brand_id,
        deleted: true,
        files_removed: reclaimed.removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryCatalogStore;
    use crate::models::{BrandKind, ItemOrder};

    #[tokio::test]
    async fn test_handle_reclaims_files_and_tolerates_missing_ones() {
        let store = MemoryCatalogStore::new();
        let root = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(root.path());

        let brand = store.create_brand("Acme", BrandKind::Brand).await.unwrap();
        let item = store.create_item(brand.id, "Kettle").await.unwrap();
        let sibling = store.create_item(brand.id, "Mug").await.unwrap();
        let dir = storage.item_dir(brand.id, item.id);
        std::fs::create_dir_all(&dir).unwrap();

        for (position, name) in [(1, "a.jpg"), (2, "b.jpg")] {
            let image = store.create_image(item.id, position, Some("https://x/y.jpg")).await.unwrap();
            let path = MediaStorage::relative_path(brand.id, item.id, name);
            store.mark_image_downloaded(image.id, &path, name).await.unwrap();
        }
        // Only one of the two files exists on disk.
        std::fs::write(dir.join("a.jpg"), b"a").unwrap();

        let response = handle(&store, &storage, DeleteItemCommand { id: item.id })
            .await
            .unwrap();

        assert_eq!(response.brand_id, brand.id);
        assert_eq!(response.files_removed, 1);
        assert!(!dir.exists());

        let remaining = store.list_items(brand.id, ItemOrder::Title).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].item.id, sibling.id);
    }

    #[tokio::test]
    async fn test_handle_not_found() {
        let store = MemoryCatalogStore::new();
        let root = tempfile::tempdir().unwrap();
        let storage = MediaStorage::new(root.path());

        let result = handle(&store, &storage, DeleteItemCommand { id: 3 }).await;
        assert!(matches!(result, Err(DeleteItemError::NotFound(3))));
        assert!(matches!(
            handle(&store, &storage, DeleteItemCommand { id: -1 }).await,
            Err(DeleteItemError::InvalidId)
        ));
    }
}
