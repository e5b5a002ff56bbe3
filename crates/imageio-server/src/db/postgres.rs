//! PostgreSQL implementation of [`CatalogStore`]

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

use super::{CatalogStore, DeletedItem, StoreError, StoreResult};
use crate::models::{
    Brand, BrandKind, BrandSummary, DownloadedImage, Image, Item, ItemOrder, ItemWithImages,
};

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const IMAGE_COLUMNS: &str =
    "id, item_id, position, original_url, storage_path, public_filename, status, created_at";

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_brand(&self, name: &str, kind: BrandKind) -> StoreResult<Brand> {
        let brand = sqlx::query_as::<_, Brand>(
            "INSERT INTO brands (name, kind) VALUES ($1, $2) \
             RETURNING id, name, kind, created_at",
        )
        .bind(name)
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(brand)
    }

    async fn get_brand(&self, id: i64) -> StoreResult<Option<Brand>> {
        let brand = sqlx::query_as::<_, Brand>(
            "SELECT id, name, kind, created_at FROM brands WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(brand)
    }

    async fn list_brands(&self) -> StoreResult<Vec<BrandSummary>> {
        let brands = sqlx::query_as::<_, BrandSummary>(
            r#"
            SELECT b.id, b.name, b.kind, b.created_at,
                   (SELECT COUNT(*) FROM items i WHERE i.brand_id = b.id) AS item_count,
                   (SELECT COUNT(*) FROM images im
                      JOIN items i ON i.id = im.item_id
                     WHERE i.brand_id = b.id AND im.status = 'downloaded') AS image_count
            FROM brands b
            ORDER BY b.kind, b.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(brands)
    }

    async fn delete_brand(&self, id: i64) -> StoreResult<Option<Vec<String>>> {
        let mut tx = self.pool.begin().await?;

        let paths: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT im.storage_path
            FROM images im
            JOIN items i ON i.id = im.item_id
            WHERE i.brand_id = $1 AND im.storage_path IS NOT NULL
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM brands WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(paths))
    }

    async fn create_item(&self, brand_id: i64, title: &str) -> StoreResult<Item> {
        sqlx::query_as::<_, Item>(
            "INSERT INTO items (brand_id, title) VALUES ($1, $2) \
             RETURNING id, brand_id, title, created_at",
        )
        .bind(brand_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                StoreError::not_found("Brand", brand_id)
            },
            other => StoreError::Sqlx(other),
        })
    }

    async fn get_item(&self, id: i64) -> StoreResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            "SELECT id, brand_id, title, created_at FROM items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn delete_item(&self, id: i64) -> StoreResult<Option<DeletedItem>> {
        let mut tx = self.pool.begin().await?;

        let paths: Vec<String> = sqlx::query_scalar(
            "SELECT storage_path FROM images WHERE item_id = $1 AND storage_path IS NOT NULL",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let brand_id: Option<i64> =
            sqlx::query_scalar("DELETE FROM items WHERE id = $1 RETURNING brand_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(brand_id) = brand_id else {
            return Ok(None);
        };

        tx.commit().await?;
        Ok(Some(DeletedItem {
            brand_id,
            storage_paths: paths,
        }))
    }

    async fn list_items(&self, brand_id: i64, order: ItemOrder) -> StoreResult<Vec<ItemWithImages>> {
        let order_by = match order {
            ItemOrder::Newest => "created_at DESC, id DESC",
            ItemOrder::Title => "title ASC, id ASC",
        };

        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT id, brand_id, title, created_at FROM items WHERE brand_id = $1 ORDER BY {order_by}"
        ))
        .bind(brand_id)
        .fetch_all(&self.pool)
        .await?;

        let images = sqlx::query_as::<_, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images \
             WHERE item_id IN (SELECT id FROM items WHERE brand_id = $1) \
             ORDER BY item_id, position"
        ))
        .bind(brand_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_item: HashMap<i64, Vec<Image>> = HashMap::new();
        for image in images {
            by_item.entry(image.item_id).or_default().push(image);
        }

        Ok(items
            .into_iter()
            .map(|item| ItemWithImages {
                images: by_item.remove(&item.id).unwrap_or_default(),
                item,
            })
            .collect())
    }

    async fn create_image(
        &self,
        item_id: i64,
        position: i32,
        original_url: Option<&str>,
    ) -> StoreResult<Image> {
        sqlx::query_as::<_, Image>(&format!(
            "INSERT INTO images (item_id, position, original_url, status) \
             VALUES ($1, $2, $3, 'pending') RETURNING {IMAGE_COLUMNS}"
        ))
        .bind(item_id)
        .bind(position)
        .bind(original_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                StoreError::not_found("Item", item_id)
            },
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Duplicate(format!(
                    "Item {} already has an image at position {}",
                    item_id, position
                ))
            },
            sqlx::Error::Database(ref db_err) if db_err.is_check_violation() => {
                StoreError::InvalidPosition(position)
            },
            other => StoreError::Sqlx(other),
        })
    }

    async fn mark_image_downloaded(
        &self,
        image_id: i64,
        storage_path: &str,
        public_filename: &str,
    ) -> StoreResult<()> {
        let updated = sqlx::query(
            "UPDATE images SET status = 'downloaded', storage_path = $2, public_filename = $3 \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(image_id)
        .bind(storage_path)
        .bind(public_filename)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::InvalidTransition(image_id));
        }
        Ok(())
    }

    async fn mark_image_failed(&self, image_id: i64) -> StoreResult<()> {
        let updated = sqlx::query(
            "UPDATE images SET status = 'failed' WHERE id = $1 AND status = 'pending'",
        )
        .bind(image_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::InvalidTransition(image_id));
        }
        Ok(())
    }

    async fn downloaded_images(&self, brand_id: i64) -> StoreResult<Vec<DownloadedImage>> {
        let images = sqlx::query_as::<_, DownloadedImage>(
            r#"
            SELECT im.id AS image_id, i.id AS item_id, i.title AS item_title, im.position,
                   im.storage_path, im.public_filename
            FROM images im
            JOIN items i ON i.id = im.item_id
            WHERE i.brand_id = $1
              AND im.status = 'downloaded'
              AND im.storage_path IS NOT NULL
              AND im.public_filename IS NOT NULL
            ORDER BY i.title, i.id, im.position
            "#,
        )
        .bind(brand_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }
}
