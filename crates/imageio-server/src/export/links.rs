//! Link spreadsheet export

use rust_xlsxwriter::{Format, Workbook};

use super::ExportError;
use crate::config::MAX_IMAGE_SLOTS;
use crate::db::CatalogStore;
use crate::models::{Brand, ImageStatus, ItemOrder};

/// Longest worksheet name Excel accepts
const MAX_SHEET_NAME_LEN: usize = 31;

/// Worksheet name for `name`: characters Excel rejects become `-`, the result is cut to
/// 31 characters, and an empty name falls back to `Export`
pub fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '-',
            c => c,
        })
        .take(MAX_SHEET_NAME_LEN)
        .collect();

    let trimmed = cleaned.trim().trim_matches('\'');
    if trimmed.is_empty() {
        "Export".to_string()
    } else {
        trimmed.to_string()
    }
}

/// XLSX of every item of `brand` with the public URLs of its downloaded images
///
/// Row 1 holds the headers `title`, `image-1` ... `image-5`. Each following row is one
/// item (ordered by title) with each URL in the column of its slot, so the sheet can be
/// imported again as-is.
#[tracing::instrument(skip(store, brand), fields(brand_id = brand.id))]
pub async fn build_links_workbook(
    store: &dyn CatalogStore,
    brand: &Brand,
    public_base_url: &str,
) -> Result<Vec<u8>, ExportError> {
    let items = store.list_items(brand.id, ItemOrder::Title).await?;
    let base = public_base_url.trim_end_matches('/');

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name(&brand.name))?;

    sheet.write_string_with_format(0, 0, "title", &bold)?;
    for slot in 1..=MAX_IMAGE_SLOTS {
        sheet.write_string_with_format(0, slot as u16, format!("image-{}", slot), &bold)?;
    }

    for (idx, entry) in items.iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_string(row, 0, &entry.item.title)?;

        for image in &entry.images {
            if image.status != ImageStatus::Downloaded {
                continue;
            }
            if let Some(path) = &image.storage_path {
                sheet.write_string(row, image.position as u16, format!("{}/{}", base, path))?;
            }
        }
    }

    sheet.autofit();
    Ok(workbook.save_to_buffer()?)
}
