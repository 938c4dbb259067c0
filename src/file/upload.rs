//! Upload pipeline for stowage.
//!
//! A request moves through `Validating -> Routing -> Persisting`:
//! - Each incoming file is checked against the MIME allow-list, then streamed
//!   into `{root}/.incoming/` under a UUID name while its size is counted.
//!   Offending files are recorded as failed and the batch continues.
//! - Once the whole request has been received the batch is committed: the
//!   target folder is ensured and every staged file is moved to a reserved,
//!   collision-free name inside it.
//!
//! Nothing becomes visible in a folder before commit. Staged files that are
//! never committed (rejected or cancelled request) are removed on drop.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::folder::{Folder, FolderStore};
use super::sanitize::{sanitize_file_name, unique_suffix};
use crate::{Result, StowageError};

/// Name of the staging directory below the storage root.
///
/// Sanitized folder names never contain `.`, so it cannot clash with a folder.
pub const STAGING_DIR_NAME: &str = ".incoming";

/// Attempts at finding a free stored name before giving up on a file.
const MAX_NAME_ATTEMPTS: usize = 3;

/// Limits applied to every upload request.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Maximum size of one file in bytes.
    pub max_file_size: u64,
    /// Maximum number of files per request.
    pub max_files: usize,
    /// Accepted MIME types (empty = accept everything).
    pub allowed_mime_types: Vec<String>,
    /// Folder used when the requested one cannot be created.
    pub fallback_folder: Option<String>,
}

impl UploadLimits {
    /// Check a MIME type against the allow-list, ignoring parameters and case.
    pub fn allows_mime(&self, mime_type: &str) -> bool {
        if self.allowed_mime_types.is_empty() {
            return true;
        }
        let essence = mime_essence(mime_type);
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(essence))
    }
}

fn mime_essence(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or(mime_type).trim()
}

/// Guess a MIME type from a file name.
pub fn guess_mime_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// One incoming file: untrusted metadata plus its byte stream.
pub struct FilePayload<S> {
    /// File name as declared by the client.
    pub original_name: String,
    /// Declared MIME type, guessed from the name when absent.
    pub mime_type: Option<String>,
    /// Declared size, checked against the bytes received when present.
    pub declared_size: Option<u64>,
    /// File content.
    pub stream: S,
}

impl<S> FilePayload<S> {
    /// Create a payload without declared type or size.
    pub fn new(original_name: impl Into<String>, stream: S) -> Self {
        Self {
            original_name: original_name.into(),
            mime_type: None,
            declared_size: None,
            stream,
        }
    }

    /// Set the declared MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the declared size.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }
}

/// Stream type produced by [`FilePayload::from_bytes`].
pub type BytesStream = futures::stream::Iter<std::vec::IntoIter<io::Result<Vec<u8>>>>;

impl FilePayload<BytesStream> {
    /// Payload backed by an in-memory buffer, with its size declared.
    pub fn from_bytes(original_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let content = content.into();
        let size = content.len() as u64;
        Self::new(original_name, futures::stream::iter(vec![Ok(content)])).with_declared_size(size)
    }
}

/// A file persisted inside a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Name as declared by the client (untrusted).
    pub original_name: String,
    /// Name on disk: `base-suffix.extension`.
    pub stored_name: String,
    /// Bytes actually written.
    pub size: u64,
    /// MIME type.
    pub mime_type: String,
    /// Owning folder name.
    pub folder: String,
}

/// Why a single file was not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// MIME type not in the allow-list.
    DisallowedType,
    /// File exceeded the size limit.
    TooLarge,
    /// Received byte count differs from the declared size.
    SizeMismatch,
    /// Filesystem error while writing or moving the file.
    IoFailure,
}

impl FailureReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::DisallowedType => "DISALLOWED_TYPE",
            FailureReason::TooLarge => "TOO_LARGE",
            FailureReason::SizeMismatch => "SIZE_MISMATCH",
            FailureReason::IoFailure => "IO_FAILURE",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::DisallowedType => "disallowed type",
            FailureReason::TooLarge => "too large",
            FailureReason::SizeMismatch => "size mismatch",
            FailureReason::IoFailure => "I/O failure",
        };
        f.write_str(s)
    }
}

/// A file that was declared but not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    /// Name as declared by the client.
    pub original_name: String,
    /// MIME type used for validation.
    pub mime_type: String,
    /// Failure kind.
    pub reason: FailureReason,
    /// Human-readable detail.
    pub message: String,
}

/// Outcome for one declared file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Stored(StoredFile),
    Failed(FailedFile),
}

impl FileOutcome {
    /// Whether the file landed on disk.
    pub fn is_stored(&self) -> bool {
        matches!(self, FileOutcome::Stored(_))
    }
}

/// Overall result of a committed upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Every declared file was stored.
    Completed,
    /// At least one declared file failed; the others are stored.
    PartiallyFailed,
}

/// Per-file outcomes of one upload, in the order the files were received.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    /// Folder the files were stored in.
    pub folder: String,
    /// One outcome per declared file.
    pub outcomes: Vec<FileOutcome>,
}

impl UploadReport {
    /// Completed iff every declared file was stored.
    pub fn status(&self) -> UploadStatus {
        if self.outcomes.iter().all(FileOutcome::is_stored) {
            UploadStatus::Completed
        } else {
            UploadStatus::PartiallyFailed
        }
    }

    /// Iterate over the stored files.
    pub fn stored(&self) -> impl Iterator<Item = &StoredFile> {
        self.outcomes.iter().filter_map(|o| match o {
            FileOutcome::Stored(file) => Some(file),
            FileOutcome::Failed(_) => None,
        })
    }

    /// Number of stored files.
    pub fn stored_count(&self) -> usize {
        self.stored().count()
    }

    /// Number of failed files.
    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.stored_count()
    }
}

/// A file sitting in the staging directory.
///
/// The staged bytes are deleted on drop unless the file was persisted.
#[derive(Debug)]
struct StagedFile {
    original_name: String,
    mime_type: String,
    size: u64,
    path: PathBuf,
    persisted: bool,
}

impl StagedFile {
    fn failure(&self, reason: FailureReason, message: impl Into<String>) -> FailedFile {
        FailedFile {
            original_name: self.original_name.clone(),
            mime_type: self.mime_type.clone(),
            reason,
            message: message.into(),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove staged upload"
                );
            }
        }
    }
}

#[derive(Debug)]
enum Entry {
    Staged(StagedFile),
    Failed(FailedFile),
}

/// Validates, stages and persists uploads into folders of a [`FolderStore`].
#[derive(Debug, Clone)]
pub struct UploadPipeline {
    store: FolderStore,
    limits: UploadLimits,
}

impl UploadPipeline {
    /// Create a new pipeline.
    pub fn new(store: FolderStore, limits: UploadLimits) -> Self {
        Self { store, limits }
    }

    /// Get the folder store.
    pub fn store(&self) -> &FolderStore {
        &self.store
    }

    /// Get the configured limits.
    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Start a batch that files can be streamed into one at a time.
    pub fn begin(&self) -> UploadBatch<'_> {
        UploadBatch {
            pipeline: self,
            entries: Vec::new(),
        }
    }

    /// Upload a complete batch of files into `folder`.
    pub async fn upload<S, B, E>(
        &self,
        folder: &str,
        files: Vec<FilePayload<S>>,
    ) -> Result<UploadReport>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        if folder.trim().is_empty() {
            return Err(StowageError::InvalidName(
                "folder name is required".to_string(),
            ));
        }
        if files.len() > self.limits.max_files {
            tracing::warn!(
                count = files.len(),
                limit = self.limits.max_files,
                "Rejected upload with too many files"
            );
            return Err(StowageError::TooManyFiles {
                limit: self.limits.max_files,
            });
        }

        let mut batch = self.begin();
        for file in files {
            batch.stage(file).await?;
        }
        batch.commit(folder).await
    }

    fn staging_dir(&self) -> PathBuf {
        self.store.root().path().join(STAGING_DIR_NAME)
    }

    /// Resolve the destination folder, honouring the configured fallback.
    fn route(&self, folder: &str) -> Result<Folder> {
        match self.store.ensure_folder(folder) {
            Ok(target) => Ok(target),
            Err(StowageError::Io(e)) => match &self.limits.fallback_folder {
                Some(fallback) => {
                    tracing::warn!(
                        folder,
                        fallback = %fallback,
                        error = %e,
                        "Target folder unavailable, using fallback folder"
                    );
                    self.store.ensure_folder(fallback)
                }
                None => Err(StowageError::Io(e)),
            },
            Err(e) => Err(e),
        }
    }

    /// Move a staged file into `folder` under a fresh, unused stored name.
    async fn persist(&self, mut staged: StagedFile, folder: &Folder) -> FileOutcome {
        let safe = sanitize_file_name(&staged.original_name);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let stored_name = safe.stored_name(&unique_suffix());
            let destination = folder.path.join(&stored_name);

            // Reserve the name first so an existing file is never replaced.
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&destination)
                .await
            {
                Ok(reservation) => drop(reservation),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!(stored_name = %stored_name, "Stored name taken, retrying");
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        folder = %folder.name,
                        error = %e,
                        "Failed to reserve stored name"
                    );
                    return FileOutcome::Failed(
                        staged.failure(FailureReason::IoFailure, "failed to save file"),
                    );
                }
            }

            if let Err(e) = fs::rename(&staged.path, &destination).await {
                let _ = fs::remove_file(&destination).await;
                tracing::error!(
                    folder = %folder.name,
                    stored_name = %stored_name,
                    error = %e,
                    "Failed to move staged upload into place"
                );
                return FileOutcome::Failed(
                    staged.failure(FailureReason::IoFailure, "failed to save file"),
                );
            }

            staged.persisted = true;
            tracing::info!(
                folder = %folder.name,
                stored_name = %stored_name,
                size = staged.size,
                "Stored uploaded file"
            );
            return FileOutcome::Stored(StoredFile {
                original_name: staged.original_name.clone(),
                stored_name,
                size: staged.size,
                mime_type: staged.mime_type.clone(),
                folder: folder.name.clone(),
            });
        }

        FileOutcome::Failed(staged.failure(
            FailureReason::IoFailure,
            "could not allocate a unique stored name",
        ))
    }
}

/// Files of one request received so far.
///
/// Dropping a batch without committing it discards every staged file.
#[derive(Debug)]
pub struct UploadBatch<'a> {
    pipeline: &'a UploadPipeline,
    entries: Vec<Entry>,
}

impl UploadBatch<'_> {
    /// Number of files declared so far (staged or failed).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no file has been declared yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate one file and stream it into staging.
    ///
    /// Per-file problems (type, size, write errors) are recorded in the batch
    /// and return `Ok`. Errors are request-level: exceeding the file count,
    /// a broken input stream or a failing staging directory. Either way the caller should drop the batch.
    pub async fn stage<S, B, E>(&mut self, payload: FilePayload<S>) -> Result<()>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: fmt::Display,
    {
        let limits = &self.pipeline.limits;
        if self.entries.len() >= limits.max_files {
            tracing::warn!(limit = limits.max_files, "Rejected upload with too many files");
            return Err(StowageError::TooManyFiles {
                limit: limits.max_files,
            });
        }

        let FilePayload {
            original_name,
            mime_type,
            declared_size,
            stream,
        } = payload;
        let mime_type = mime_type
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| guess_mime_type(&original_name));

        if !limits.allows_mime(&mime_type) {
            tracing::warn!(
                file = %original_name,
                mime_type = %mime_type,
                "Rejected file upload: type not allowed"
            );
            self.entries.push(Entry::Failed(FailedFile {
                message: format!("File type not allowed: {mime_type}"),
                original_name,
                mime_type,
                reason: FailureReason::DisallowedType,
            }));
            return Ok(());
        }

        let staging_dir = self.pipeline.staging_dir();
        fs::create_dir_all(&staging_dir).await?;
        let path = staging_dir.join(format!("{}.part", Uuid::new_v4()));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let mut staged = StagedFile {
            original_name,
            mime_type,
            size: 0,
            path,
            persisted: false,
        };

        let mut stream = std::pin::pin!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::warn!(file = %staged.original_name, error = %e, "Upload stream failed");
                StowageError::Interrupted(format!("'{}': {e}", staged.original_name))
            })?;
            let bytes = chunk.as_ref();

            staged.size += bytes.len() as u64;
            if staged.size > limits.max_file_size {
                tracing::warn!(
                    file = %staged.original_name,
                    limit = limits.max_file_size,
                    "Rejected file upload: too large"
                );
                let failure = staged.failure(
                    FailureReason::TooLarge,
                    format!("File exceeds the maximum size of {} bytes", limits.max_file_size),
                );
                self.entries.push(Entry::Failed(failure));
                return Ok(());
            }

            if let Err(e) = file.write_all(bytes).await {
                tracing::error!(file = %staged.original_name, error = %e, "Failed to stage upload");
                let failure = staged.failure(FailureReason::IoFailure, "failed to save file");
                self.entries.push(Entry::Failed(failure));
                return Ok(());
            }
        }

        if let Err(e) = file.flush().await {
            tracing::error!(file = %staged.original_name, error = %e, "Failed to stage upload");
            let failure = staged.failure(FailureReason::IoFailure, "failed to save file");
            self.entries.push(Entry::Failed(failure));
            return Ok(());
        }
        drop(file);

        if let Some(declared) = declared_size {
            if declared != staged.size {
                tracing::warn!(
                    file = %staged.original_name,
                    declared,
                    received = staged.size,
                    "Rejected file upload: size mismatch"
                );
                let failure = staged.failure(
                    FailureReason::SizeMismatch,
                    format!("Declared {declared} bytes but received {}", staged.size),
                );
                self.entries.push(Entry::Failed(failure));
                return Ok(());
            }
        }

        tracing::debug!(file = %staged.original_name, size = staged.size, "Staged upload");
        self.entries.push(Entry::Staged(staged));
        Ok(())
    }

    /// Route the batch to `folder` and persist every staged file.
    ///
    /// Fails without storing anything when the folder is blank or unusable,
    /// or when no file was declared.
    pub async fn commit(self, folder: &str) -> Result<UploadReport> {
        let UploadBatch { pipeline, entries } = self;

        if folder.trim().is_empty() {
            return Err(StowageError::InvalidName(
                "folder name is required".to_string(),
            ));
        }
        if entries.is_empty() {
            return Err(StowageError::NoFiles);
        }

        let target = pipeline.route(folder)?;

        let mut outcomes = Vec::with_capacity(entries.len());
        for entry in entries {
            let outcome = match entry {
                Entry::Failed(failed) => FileOutcome::Failed(failed),
                Entry::Staged(staged) => pipeline.persist(staged, &target).await,
            };
            outcomes.push(outcome);
        }

        let report = UploadReport {
            folder: target.name,
            outcomes,
        };
        tracing::info!(
            folder = %report.folder,
            stored = report.stored_count(),
            failed = report.failed_count(),
            "Processed upload"
        );
        Ok(report)
    }
}

/// Remove every file left in the staging directory below `root`.
pub(crate) fn purge_staging(root: &Path) -> Result<usize> {
    let dir = root.join(STAGING_DIR_NAME);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && std::fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}
