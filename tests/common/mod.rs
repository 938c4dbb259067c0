//! Test helpers for HTTP API tests.
//!
//! Builds the full router over a temporary storage root.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use tempfile::TempDir;

use stowage::config::UploadConfig;
use stowage::file::{FolderStore, StorageRoot, UploadLimits, UploadPipeline};
use stowage::web::router::create_router;
use stowage::web::AppState;

/// A running test server and the storage root behind it.
pub struct TestApp {
    pub server: TestServer,
    pub root: PathBuf,
    pub pipeline: UploadPipeline,
    _temp_dir: TempDir,
}

/// Default folders used by every test app.
pub fn default_folders() -> Vec<String> {
    vec![
        "pictures".to_string(),
        "videos".to_string(),
        "documents".to_string(),
    ]
}

/// Limits used by most tests: default MIME list, small sizes.
pub fn test_limits() -> UploadLimits {
    UploadLimits {
        max_file_size: 1024,
        max_files: 3,
        ..UploadConfig::default().limits()
    }
}

/// Create a test app with [`test_limits`].
pub fn create_test_app() -> TestApp {
    create_test_app_with(test_limits())
}

/// Create a test app with custom limits.
pub fn create_test_app_with(limits: UploadLimits) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = StorageRoot::create(temp_dir.path().join("uploads")).expect("Failed to create root");
    let store = FolderStore::new(root, default_folders());
    store
        .initialize_folders()
        .expect("Failed to initialize folders");

    let pipeline = UploadPipeline::new(store, limits);
    let root_path = pipeline.store().root().path().to_path_buf();
    let app_state = Arc::new(AppState::new(pipeline.clone()));
    let router = create_router(app_state, &[], Duration::from_secs(30));
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        root: root_path,
        pipeline,
        _temp_dir: temp_dir,
    }
}

/// Sorted names of the entries inside `root/folder`.
pub fn files_in(root: &Path, folder: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root.join(folder))
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Number of files left in the staging directory.
pub fn staged_count(root: &Path) -> usize {
    std::fs::read_dir(root.join(stowage::file::STAGING_DIR_NAME))
        .map(|entries| entries.count())
        .unwrap_or(0)
}
