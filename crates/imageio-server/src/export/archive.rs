//! Zip export of downloaded images

use std::collections::HashSet;
use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::PathBuf;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ExportError;
use crate::db::CatalogStore;
use crate::storage::namespace::{resolve_unique, slugify};
use crate::storage::MediaStorage;

/// A finished archive in an anonymous temporary file, rewound to the start
#[derive(Debug)]
pub struct ImageArchive {
    pub file: File,
    pub entries: usize,
    pub bytes: u64,
}

/// Entry to copy into the archive
struct PendingEntry {
    folder: String,
    filename: String,
    source: PathBuf,
}

/// Zip every downloaded image of `brand_id` whose file still exists
///
/// Entries are named `{slug(item title)}/{filename}`. Filenames are unique across the
/// whole archive; later duplicates get `-1`, `-2`, ... suffixes.
#[tracing::instrument(skip(store, storage))]
pub async fn build_archive(
    store: &dyn CatalogStore,
    storage: &MediaStorage,
    brand_id: i64,
) -> Result<ImageArchive, ExportError> {
    let images = store.downloaded_images(brand_id).await?;

    let pending: Vec<PendingEntry> = images
        .into_iter()
        .filter_map(|image| {
            let source = storage.resolve(&image.storage_path)?;
            Some(PendingEntry {
                folder: slugify(&image.item_title),
                filename: image.public_filename,
                source,
            })
        })
        .collect();

    if pending.is_empty() {
        return Err(ExportError::ArchiveEmpty);
    }

    let archive = tokio::task::spawn_blocking(move || write_archive(pending)).await??;
    info!(entries = archive.entries, bytes = archive.bytes, "Archive built");
    Ok(archive)
}

fn write_archive(pending: Vec<PendingEntry>) -> Result<ImageArchive, ExportError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(tempfile::tempfile()?);
    let mut used: HashSet<String> = HashSet::new();
    let mut entries = 0usize;

    for entry in pending {
        let mut source = match File::open(&entry.source) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %entry.source.display(), error = %e, "Skipping missing image");
                continue;
            },
        };

        let filename = resolve_unique(&used, &entry.filename);
        zip.start_file(format!("{}/{}", entry.folder, filename), options)?;
        std::io::copy(&mut source, &mut zip)?;
        used.insert(filename);
        entries += 1;
    }

    if entries == 0 {
        return Err(ExportError::ArchiveEmpty);
    }

    let mut file = zip.finish()?;
    let bytes = file.seek(SeekFrom::End(0))?;
    file.seek(SeekFrom::Start(0))?;

    Ok(ImageArchive {
        file,
        entries,
        bytes,
    })
}
