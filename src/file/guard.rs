//! Storage root confinement.
//!
//! Every folder or file path handed out by this crate is produced by
//! [`resolve`], which canonicalizes the joined path first and only then
//! checks that the result still lies strictly below the storage root.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::{Result, StowageError};

/// The single directory that owns every folder.
#[derive(Debug, Clone)]
pub struct StorageRoot {
    /// Canonical absolute path of the root.
    path: PathBuf,
}

impl StorageRoot {
    /// Open the storage root at `path`, creating it recursively if needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(StowageError::Config(
                "storage root must not be empty".to_string(),
            ));
        }

        if !path.exists() {
            tracing::info!(root = %path.display(), "Creating storage root");
            fs::create_dir_all(path)?;
        }

        let path = path.canonicalize()?;
        if !path.is_dir() {
            return Err(StowageError::Config(format!(
                "storage root {} is not a directory",
                path.display()
            )));
        }

        Ok(Self { path })
    }

    /// Get the canonical path of the root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last component of the root, used to build client-facing folder paths.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Resolve a relative name below this root.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf> {
        resolve(&self.path, raw)
    }
}

/// Resolve `raw` against `root` and guarantee the result is a descendant of it.
///
/// `.` and `..` segments are folded, absolute inputs replace the root the way
/// [`Path::join`] does, and the longest existing prefix is canonicalized so
/// symlinks pointing outside the root are caught. Fails with
/// [`StowageError::PathTraversal`] when the outcome is the root itself or
/// lies anywhere outside it.
pub fn resolve(root: &Path, raw: &str) -> Result<PathBuf> {
    if raw.contains('\0') {
        return Err(traversal(root, raw));
    }

    let root = canonicalize_lenient(&normalize(root))?;
    let candidate = canonicalize_lenient(&normalize(&root.join(raw)))?;

    if candidate != root && candidate.starts_with(&root) {
        Ok(candidate)
    } else {
        Err(traversal(&root, raw))
    }
}

fn traversal(root: &Path, raw: &str) -> StowageError {
    tracing::warn!(
        root = %root.display(),
        input = raw,
        "Rejected path outside storage root"
    );
    StowageError::PathTraversal(raw.to_string())
}

/// Fold `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Canonicalize the longest existing prefix of `path` and re-append the rest.
///
/// `path` must already be normalized, so the missing tail only holds plain
/// names.
fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path;
    let mut missing: Vec<OsString> = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                for name in missing.iter().rev() {
                    resolved.push(name);
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => return Err(e),
                }
            }
            Err(e) => return Err(e),
        }
    }
}
