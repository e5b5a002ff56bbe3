//! Feature state backed by the in-memory store, for route tests

use std::sync::Arc;
use tempfile::TempDir;

use crate::config::MediaConfig;
use crate::db::MemoryCatalogStore;
use crate::features::FeatureState;
use crate::storage::MediaStorage;

/// Feature state plus handles tests need to seed and inspect it
pub struct TestContext {
    pub state: FeatureState,
    pub store: Arc<MemoryCatalogStore>,
    /// Storage root; removed on drop
    pub root: TempDir,
}

pub fn test_context() -> TestContext {
    let root = tempfile::tempdir().expect("temp storage root");
    let store = Arc::new(MemoryCatalogStore::new());

    let media = MediaConfig {
        storage_path: root.path().to_path_buf(),
        public_base_url: "http://localhost:8000/storage".to_string(),
        fetch_timeout_secs: 5,
        fetch_verify_tls: true,
        ..MediaConfig::default()
    };
    let state = FeatureState::new(store.clone(), MediaStorage::new(root.path()), media)
        .expect("http client");

    TestContext { state, store, root }
}
