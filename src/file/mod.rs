//! Folder-scoped file storage for stowage.
//!
//! This module provides:
//! - Confinement of every path to a single storage root
//! - Sanitization of folder names and uploaded file names
//! - Folder listing, explicit creation and auto-creation
//! - The upload pipeline (validate, stage, route, persist)

mod folder;
mod guard;
mod sanitize;
mod upload;

pub use folder::{Folder, FolderStore};
pub use guard::{resolve, StorageRoot};
pub use sanitize::{
    sanitize_file_name, sanitize_folder_name, unique_suffix, SafeFileName,
    MAX_BASE_NAME_LENGTH, MAX_EXTENSION_LENGTH,
};
pub use upload::{
    guess_mime_type, BytesStream, FailedFile, FailureReason, FileOutcome, FilePayload,
    StoredFile, UploadBatch, UploadLimits, UploadPipeline, UploadReport, UploadStatus,
    STAGING_DIR_NAME,
};
