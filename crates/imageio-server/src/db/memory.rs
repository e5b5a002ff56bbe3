//! In-process implementation of [`CatalogStore`]
//!
//! Mirrors the PostgreSQL constraints: cascading deletes, unique slot positions, slot
//! bounds and monotone image status transitions.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{CatalogStore, DeletedItem, StoreError, StoreResult};
use crate::config::MAX_IMAGE_SLOTS;
use crate::models::{
    Brand, BrandKind, BrandSummary, DownloadedImage, Image, ImageStatus, Item, ItemOrder,
    ItemWithImages,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    brands: BTreeMap<i64, Brand>,
    items: BTreeMap<i64, Item>,
    images: BTreeMap<i64, Image>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn item_images(&self, item_id: i64) -> Vec<Image> {
        let mut images: Vec<Image> = self
            .images
            .values()
            .filter(|image| image.item_id == item_id)
            .cloned()
            .collect();
        images.sort_by_key(|image| image.position);
        images
    }

    /// Removes the images of `item_id`, returning their storage paths
    fn remove_images(&mut self, item_id: i64) -> Vec<String> {
        let ids: Vec<i64> = self
            .images
            .values()
            .filter(|image| image.item_id == item_id)
            .map(|image| image.id)
            .collect();

        ids.into_iter()
            .filter_map(|id| self.images.remove(&id))
            .filter_map(|image| image.storage_path)
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryCatalogStore {
    tables: Mutex<Tables>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finalize(
        &self,
        image_id: i64,
        status: ImageStatus,
        location: Option<(&str, &str)>,
    ) -> StoreResult<()> {
        let mut tables = self.lock();
        let image = tables
            .images
            .get_mut(&image_id)
            .filter(|image| image.status == ImageStatus::Pending)
            .ok_or(StoreError::InvalidTransition(image_id))?;

        image.status = status;
        if let Some((storage_path, public_filename)) = location {
            image.storage_path = Some(storage_path.to_string());
            image.public_filename = Some(public_filename.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_brand(&self, name: &str, kind: BrandKind) -> StoreResult<Brand> {
        let mut tables = self.lock();
        let brand = Brand {
            id: tables.next_id(),
            name: name.to_string(),
            kind,
            created_at: Utc::now(),
        };
        tables.brands.insert(brand.id, brand.clone());
        Ok(brand)
    }

    async fn get_brand(&self, id: i64) -> StoreResult<Option<Brand>> {
        Ok(self.lock().brands.get(&id).cloned())
    }

    async fn list_brands(&self) -> StoreResult<Vec<BrandSummary>> {
        let tables = self.lock();
        let mut summaries: Vec<BrandSummary> = tables
            .brands
            .values()
            .map(|brand| {
                let item_ids: Vec<i64> = tables
                    .items
                    .values()
                    .filter(|item| item.brand_id == brand.id)
                    .map(|item| item.id)
                    .collect();
                let image_count = tables
                    .images
                    .values()
                    .filter(|image| {
                        image.status == ImageStatus::Downloaded && item_ids.contains(&image.item_id)
                    })
                    .count();

                BrandSummary {
                    id: brand.id,
                    name: brand.name.clone(),
                    kind: brand.kind,
                    created_at: brand.created_at,
                    item_count: item_ids.len() as i64,
                    image_count: image_count as i64,
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            a.kind
                .as_str()
                .cmp(b.kind.as_str())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(summaries)
    }

    async fn delete_brand(&self, id: i64) -> StoreResult<Option<Vec<String>>> {
        let mut tables = self.lock();
        if tables.brands.remove(&id).is_none() {
            return Ok(None);
        }

        let item_ids: Vec<i64> = tables
            .items
            .values()
            .filter(|item| item.brand_id == id)
            .map(|item| item.id)
            .collect();

        let mut paths = Vec::new();
        for item_id in item_ids {
            tables.items.remove(&item_id);
            paths.extend(tables.remove_images(item_id));
        }
        Ok(Some(paths))
    }

    async fn create_item(&self, brand_id: i64, title: &str) -> StoreResult<Item> {
        let mut tables = self.lock();
        if !tables.brands.contains_key(&brand_id) {
            return Err(StoreError::not_found("Brand", brand_id));
        }

        let item = Item {
            id: tables.next_id(),
            brand_id,
            title: title.to_string(),
            created_at: Utc::now(),
        };
        tables.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: i64) -> StoreResult<Option<Item>> {
        Ok(self.lock().items.get(&id).cloned())
    }

    async fn delete_item(&self, id: i64) -> StoreResult<Option<DeletedItem>> {
        let mut tables = self.lock();
        let Some(item) = tables.items.remove(&id) else {
            return Ok(None);
        };

        Ok(Some(DeletedItem {
            brand_id: item.brand_id,
            storage_paths: tables.remove_images(id),
        }))
    }

    async fn list_items(&self, brand_id: i64, order: ItemOrder) -> StoreResult<Vec<ItemWithImages>> {
        let tables = self.lock();
        let mut items: Vec<Item> = tables
            .items
            .values()
            .filter(|item| item.brand_id == brand_id)
            .cloned()
            .collect();

        match order {
            ItemOrder::Newest => items.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
            }),
            ItemOrder::Title => {
                items.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)))
            },
        }

        Ok(items
            .into_iter()
            .map(|item| ItemWithImages {
                images: tables.item_images(item.id),
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
        if position < 1 || position > MAX_IMAGE_SLOTS as i32 {
            return Err(StoreError::InvalidPosition(position));
        }

        let mut tables = self.lock();
        if !tables.items.contains_key(&item_id) {
            return Err(StoreError::not_found("Item", item_id));
        }
        if tables
            .images
            .values()
            .any(|image| image.item_id == item_id && image.position == position)
        {
            return Err(StoreError::Duplicate(format!(
                "Item {} already has an image at position {}",
                item_id, position
            )));
        }

        let image = Image {
            id: tables.next_id(),
            item_id,
            position,
            original_url: original_url.map(str::to_string),
            storage_path: None,
            public_filename: None,
            status: ImageStatus::Pending,
            created_at: Utc::now(),
        };
        tables.images.insert(image.id, image.clone());
        Ok(image)
    }

    async fn mark_image_downloaded(
        &self,
        image_id: i64,
        storage_path: &str,
        public_filename: &str,
    ) -> StoreResult<()> {
        self.finalize(
            image_id,
            ImageStatus::Downloaded,
            Some((storage_path, public_filename)),
        )
    }

    async fn mark_image_failed(&self, image_id: i64) -> StoreResult<()> {
        self.finalize(image_id, ImageStatus::Failed, None)
    }

    async fn downloaded_images(&self, brand_id: i64) -> StoreResult<Vec<DownloadedImage>> {
        let tables = self.lock();
        let mut images: Vec<DownloadedImage> = tables
            .images
            .values()
            .filter(|image| image.status == ImageStatus::Downloaded)
            .filter_map(|image| {
                let item = tables.items.get(&image.item_id)?;
                if item.brand_id != brand_id {
                    return None;
                }
                Some(DownloadedImage {
                    image_id: image.id,
                    item_id: item.id,
                    item_title: item.title.clone(),
                    position: image.position,
                    storage_path: image.storage_path.clone()?,
                    public_filename: image.public_filename.clone()?,
                })
            })
            .collect();

        images.sort_by(|a, b| {
            a.item_title
                .cmp(&b.item_title)
                .then_with(|| a.item_id.cmp(&b.item_id))
                .then_with(|| a.position.cmp(&b.position))
        });
        Ok(images)
    }
}
