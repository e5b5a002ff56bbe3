use serde::{Deserialize, Serialize};

use crate::db::{CatalogStore, StoreError};
use crate::models::{BrandKind, BrandSummary};

/// Optional filter on brand kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListBrandsQuery {
    pub kind: Option<BrandKind>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListBrandsError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Brands ordered by kind then name, with item and image counts
#[tracing::instrument(skip(store))]
pub async fn handle(
    store: &dyn CatalogStore,
    query: ListBrandsQuery,
) -> Result<Vec<BrandSummary>, ListBrandsError> {
    let brands = store.list_brands().await?;

    Ok(match query.kind {
        Some(kind) => brands.into_iter().filter(|b| b.kind == kind).collect(),
        None => brands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryCatalogStore;

    #[tokio::test]
    async fn test_handle_filters_by_kind() {
        let store = MemoryCatalogStore::new();
        store.create_brand("Zeta", BrandKind::Brand).await.unwrap();
        store.create_brand("Sale", BrandKind::Category).await.unwrap();
        store.create_brand("Acme", BrandKind::Brand).await.unwrap();

        let all = handle(&store, ListBrandsQuery::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Zeta", "Sale"]);

        let categories = handle(
            &store,
            ListBrandsQuery {
                kind: Some(BrandKind::Category),
            },
        )
        .await
        .unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].item_count, 0);
    }
}
