//! Stowage - folder-scoped upload storage service
//!
//! Accepts batches of uploaded files over HTTP and stores them in named
//! folders below a single storage root.

pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use error::{Result, StowageError};
pub use file::{
    FileOutcome, FilePayload, Folder, FolderStore, StorageRoot, UploadLimits, UploadPipeline,
    UploadReport, UploadStatus,
};
