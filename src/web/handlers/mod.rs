//! HTTP handlers.

pub mod folder;
pub mod upload;

pub use folder::{create_folder, list_folders};
pub use upload::upload_files;

use crate::file::{FolderStore, UploadPipeline};

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Upload pipeline, which also owns the folder store.
    pub pipeline: UploadPipeline,
}

impl AppState {
    /// Create a new application state.
    pub fn new(pipeline: UploadPipeline) -> Self {
        Self { pipeline }
    }

    /// Get the folder store.
    pub fn store(&self) -> &FolderStore {
        self.pipeline.store()
    }
}
