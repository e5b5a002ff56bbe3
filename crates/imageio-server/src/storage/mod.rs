//! Local media storage
//!
//! Artifacts live at `{root}/{brand_id}/{item_id}/{filename}`; the database keeps the
//! relative part as the image's storage path. Removal is the second phase of a delete:
//! records are deleted first, files are reclaimed after the transaction commits.

pub mod namespace;

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

/// Outcome of reclaiming a set of storage paths
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimReport {
    pub removed: usize,
    /// Already gone before reclamation
    pub missing: usize,
    pub failed: usize,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the storage root if needed
    pub async fn init(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let storage = Self::new(root);
        tokio::fs::create_dir_all(&storage.root).await?;
        info!(root = %storage.root.display(), "Media storage ready");
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn brand_dir(&self, brand_id: i64) -> PathBuf {
        self.root.join(brand_id.to_string())
    }

    pub fn item_dir(&self, brand_id: i64, item_id: i64) -> PathBuf {
        self.brand_dir(brand_id).join(item_id.to_string())
    }

    /// Storage path recorded for a file saved under [`Self::item_dir`]
    pub fn relative_path(brand_id: i64, item_id: i64, filename: &str) -> String {
        format!("{}/{}/{}", brand_id, item_id, filename)
    }

    /// Absolute location of a storage path, or `None` if it would escape the root
    pub fn resolve(&self, storage_path: &str) -> Option<PathBuf> {
        let relative = Path::new(storage_path);
        let contained = !storage_path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        contained.then(|| self.root.join(relative))
    }

    /// Remove stored files, tolerating ones that are already gone, and prune
    /// directories left empty.
    #[instrument(skip(self, storage_paths), fields(count = storage_paths.len()))]
    pub async fn reclaim(&self, storage_paths: &[String]) -> ReclaimReport {
        let mut report = ReclaimReport::default();

        for storage_path in storage_paths {
            let Some(path) = self.resolve(storage_path) else {
                warn!(storage_path = %storage_path, "Refusing to remove path outside storage root");
                report.failed += 1;
                continue;
            };

            match tokio::fs::remove_file(&path).await {
                Ok(()) => report.removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => report.missing += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove stored file");
                    report.failed += 1;
                    continue;
                },
            }

            self.prune_empty_parents(&path).await;
        }

        debug!(?report, "Reclaimed stored files");
        report
    }

    /// Remove a brand's directory tree
    pub async fn remove_brand_dir(&self, brand_id: i64) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(self.brand_dir(brand_id)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }

    async fn prune_empty_parents(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            // Fails on non-empty directories, which ends the walk.
            if tokio::fs::remove_dir(dir).await.is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_escapes() {
        let storage = MediaStorage::new("/srv/media");
        assert_eq!(
            storage.resolve("3/7/photo.jpg"),
            Some(PathBuf::from("/srv/media/3/7/photo.jpg"))
        );
        assert_eq!(storage.resolve("../etc/passwd"), None);
        assert_eq!(storage.resolve("/etc/passwd"), None);
        assert_eq!(storage.resolve(""), None);
    }

    #[test]
    fn test_layout() {
        let storage = MediaStorage::new("/srv/media");
        assert_eq!(storage.item_dir(3, 7), PathBuf::from("/srv/media/3/7"));
        assert_eq!(MediaStorage::relative_path(3, 7, "a.png"), "3/7/a.png");
    }

    #[tokio::test]
    async fn test_reclaim_tolerates_missing_and_prunes_empty_dirs() {
        let root = tempfile::tempdir().unwrap();
        let storage = MediaStorage::init(root.path()).await.unwrap();

        let dir = storage.item_dir(1, 2);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("a.jpg"), b"a").await.unwrap();
        tokio::fs::write(dir.join("b.jpg"), b"b").await.unwrap();
        tokio::fs::create_dir_all(storage.item_dir(1, 3)).await.unwrap();

        let report = storage
            .reclaim(&["1/2/a.jpg".to_string(), "1/2/b.jpg".to_string(), "1/2/gone.jpg".to_string()])
            .await;

        assert_eq!(report, ReclaimReport { removed: 2, missing: 1, failed: 0 });
        assert!(!dir.exists());
        // Sibling item directory keeps the brand directory alive.
        assert!(storage.brand_dir(1).exists());
        assert!(root.path().exists());
    }

    #[tokio::test]
    async fn test_remove_brand_dir_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let storage = MediaStorage::init(root.path()).await.unwrap();
        tokio::fs::create_dir_all(storage.item_dir(9, 1)).await.unwrap();

        storage.remove_brand_dir(9).await.unwrap();
        assert!(!storage.brand_dir(9).exists());
        storage.remove_brand_dir(9).await.unwrap();
    }
}
