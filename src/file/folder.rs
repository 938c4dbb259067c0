//! Folder management below the storage root.
//!
//! The filesystem is the only source of truth: every call re-reads the
//! directory, nothing is cached between calls.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::guard::StorageRoot;
use super::sanitize::sanitize_folder_name;
use super::upload::purge_staging;
use crate::config::StorageConfig;
use crate::{Result, StowageError};

/// A folder directly below the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Sanitized folder name.
    pub name: String,
    /// Absolute path of the folder.
    pub path: PathBuf,
}

/// Lists, creates and auto-creates folders under one [`StorageRoot`].
#[derive(Debug, Clone)]
pub struct FolderStore {
    root: StorageRoot,
    default_folders: Vec<String>,
}

impl FolderStore {
    /// Create a store over an existing root.
    pub fn new(root: StorageRoot, default_folders: Vec<String>) -> Self {
        Self {
            root,
            default_folders,
        }
    }

    /// Open the root described by `config`, creating it if needed.
    ///
    /// Default folders are not touched; call [`FolderStore::initialize_folders`].
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let root = StorageRoot::create(&config.root)?;
        Ok(Self::new(root, config.default_folders.clone()))
    }

    /// Get the storage root.
    pub fn root(&self) -> &StorageRoot {
        &self.root
    }

    /// Get the configured default folders in display order.
    pub fn default_folders(&self) -> &[String] {
        &self.default_folders
    }

    /// Ensure every default folder exists and clear leftover staging files.
    pub fn initialize_folders(&self) -> Result<()> {
        for name in &self.default_folders {
            let folder = self.ensure_folder(name)?;
            tracing::debug!(folder = %folder.name, "Default folder ready");
        }

        let purged = purge_staging(self.root.path())?;
        if purged > 0 {
            tracing::info!(count = purged, "Removed abandoned staging files");
        }

        tracing::info!(
            root = %self.root.path().display(),
            "Folder structure initialized/verified"
        );
        Ok(())
    }

    /// List the names of the immediate subdirectories of the root.
    ///
    /// Hidden entries (leading `.`) and symlinks are skipped; names are
    /// returned in alphabetical order.
    pub fn list_folders(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(self.root.path()).map_err(|e| {
            tracing::error!(
                root = %self.root.path().display(),
                error = %e,
                "Failed to read storage root"
            );
            StowageError::Io(e)
        })?;

        let mut folders = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    folders.push(name.to_string());
                }
            }
        }

        folders.sort();
        Ok(folders)
    }

    /// Create a new folder, failing if it already exists.
    pub fn create_folder(&self, raw_name: &str) -> Result<Folder> {
        let (name, path) = self.resolve_folder(raw_name)?;

        match fs::create_dir(&path) {
            Ok(()) => {
                tracing::info!(folder = %name, "Created folder");
                Ok(Folder { name, path })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StowageError::AlreadyExists(format!("folder '{name}'")))
            }
            Err(e) => {
                tracing::error!(folder = %name, error = %e, "Failed to create folder");
                Err(StowageError::Io(e))
            }
        }
    }

    /// Resolve a folder, creating it when absent.
    ///
    /// Unlike [`FolderStore::create_folder`] an existing folder is success,
    /// which also covers losing a creation race to a concurrent caller.
    pub fn ensure_folder(&self, raw_name: &str) -> Result<Folder> {
        let (name, path) = self.resolve_folder(raw_name)?;

        match fs::create_dir(&path) {
            Ok(()) => {
                tracing::info!(folder = %name, "Auto-created folder");
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if !is_directory(&path) {
                    return Err(StowageError::Io(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("'{name}' exists but is not a directory"),
                    )));
                }
            }
            Err(e) => {
                tracing::error!(folder = %name, error = %e, "Failed to auto-create folder");
                return Err(StowageError::Io(e));
            }
        }

        Ok(Folder { name, path })
    }

    /// Sanitize `raw_name` and resolve it to a direct child of the root.
    ///
    /// An existing entry that resolves anywhere else (a symlink, even one
    /// pointing at a sibling folder) is rejected, so a returned name always
    /// matches the directory it names.
    fn resolve_folder(&self, raw_name: &str) -> Result<(String, PathBuf)> {
        let name = sanitize_folder_name(raw_name)?;
        let path = self.root.resolve(&name)?;

        if path != self.root.path().join(&name) {
            tracing::warn!(
                folder = %name,
                target = %path.display(),
                "Rejected folder that redirects elsewhere in storage root"
            );
            return Err(StowageError::PathTraversal(raw_name.to_string()));
        }

        Ok((name, path))
    }
}

fn is_directory(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, FolderStore) {
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::create(temp_dir.path()).unwrap();
        let store = FolderStore::new(
            root,
            vec!["pictures".to_string(), "videos".to_string()],
        );
        (temp_dir, store)
    }

    #[test]
    fn test_from_config_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            root: temp_dir.path().join("main").to_string_lossy().into_owned(),
            default_folders: vec!["documents".to_string()],
        };

        let store = FolderStore::from_config(&config).unwrap();

        assert!(temp_dir.path().join("main").is_dir());
        assert_eq!(store.default_folders(), ["documents"]);
        assert!(store.list_folders().unwrap().is_empty());
    }

    #[test]
    fn test_initialize_folders() {
        let (_temp_dir, store) = setup_store();

        store.initialize_folders().unwrap();

        assert!(store.root().path().join("pictures").is_dir());
        assert!(store.root().path().join("videos").is_dir());
        assert_eq!(store.list_folders().unwrap(), vec!["pictures", "videos"]);

        // Second run is a no-op
        store.initialize_folders().unwrap();
        assert_eq!(store.list_folders().unwrap().len(), 2);
    }

    #[test]
    fn test_list_folders_skips_files_and_hidden() {
        let (_temp_dir, store) = setup_store();
        let root = store.root().path();

        fs::create_dir(root.join("b_folder")).unwrap();
        fs::create_dir(root.join("a_folder")).unwrap();
        fs::create_dir(root.join(".incoming")).unwrap();
        fs::write(root.join("loose.txt"), b"not a folder").unwrap();
        fs::create_dir_all(root.join("a_folder").join("nested")).unwrap();

        assert_eq!(store.list_folders().unwrap(), vec!["a_folder", "b_folder"]);
    }

    #[test]
    fn test_list_folders_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = StorageRoot::create(temp_dir.path().join("gone")).unwrap();
        let store = FolderStore::new(root, vec![]);
        fs::remove_dir(temp_dir.path().join("gone")).unwrap();

        assert!(matches!(store.list_folders(), Err(StowageError::Io(_))));
    }

    #[test]
    fn test_create_folder_sanitizes_name() {
        let (_temp_dir, store) = setup_store();

        let folder = store.create_folder("My Folder!").unwrap();

        assert_eq!(folder.name, "My_Folder_");
        assert_eq!(folder.path, store.root().path().join("My_Folder_"));
        assert!(folder.path.is_dir());
    }

    #[test]
    fn test_create_folder_twice_conflicts() {
        let (_temp_dir, store) = setup_store();

        store.create_folder("My Folder!").unwrap();
        let result = store.create_folder("My Folder!");

        assert!(matches!(result, Err(StowageError::AlreadyExists(_))));
    }

    #[test]
    fn test_create_folder_blank_name() {
        let (_temp_dir, store) = setup_store();

        assert!(matches!(
            store.create_folder("   "),
            Err(StowageError::InvalidName(_))
        ));
    }

    #[test]
    fn test_create_folder_traversal_is_neutralized() {
        let (_temp_dir, store) = setup_store();

        let folder = store.create_folder("../outside").unwrap();

        assert_eq!(folder.name, "___outside");
        assert_eq!(folder.path.parent(), Some(store.root().path()));
    }

    #[test]
    fn test_create_folder_conflicts_with_file() {
        let (_temp_dir, store) = setup_store();
        fs::write(store.root().path().join("notes"), b"file").unwrap();

        assert!(matches!(
            store.create_folder("notes"),
            Err(StowageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_ensure_folder_is_idempotent() {
        let (_temp_dir, store) = setup_store();

        let first = store.ensure_folder("reports").unwrap();
        let second = store.ensure_folder("reports").unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list_folders().unwrap(), vec!["reports"]);
    }

    #[test]
    fn test_ensure_folder_after_create() {
        let (_temp_dir, store) = setup_store();

        store.create_folder("shared").unwrap();
        assert!(store.ensure_folder("shared").is_ok());
    }

    #[test]
    fn test_ensure_folder_rejects_file_in_the_way() {
        let (_temp_dir, store) = setup_store();
        fs::write(store.root().path().join("blocked"), b"file").unwrap();

        assert!(matches!(
            store.ensure_folder("blocked"),
            Err(StowageError::Io(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_folder_rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        let (_temp_dir, store) = setup_store();
        std::os::unix::fs::symlink(outside.path(), store.root().path().join("sneaky")).unwrap();

        assert!(matches!(
            store.ensure_folder("sneaky"),
            Err(StowageError::PathTraversal(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_folder_rejects_symlink_to_sibling() {
        let (_temp_dir, store) = setup_store();
        let root = store.root().path();
        fs::create_dir(root.join("documents")).unwrap();
        std::os::unix::fs::symlink(root.join("documents"), root.join("alias")).unwrap();

        assert!(matches!(
            store.ensure_folder("alias"),
            Err(StowageError::PathTraversal(_))
        ));
        assert!(matches!(
            store.create_folder("alias"),
            Err(StowageError::PathTraversal(_))
        ));
        assert!(store.ensure_folder("documents").is_ok());
    }

    #[test]
    fn test_create_folder_long_name() {
        let (_temp_dir, store) = setup_store();
        let long = "a".repeat(101);

        let folder = store.create_folder(&long).unwrap();

        assert_eq!(folder.name, long);
        assert!(folder.path.is_dir());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_create_folder_name_too_long_for_filesystem() {
        let (_temp_dir, store) = setup_store();

        assert!(matches!(
            store.create_folder(&"a".repeat(300)),
            Err(StowageError::Io(_))
        ));
    }

    #[test]
    fn test_concurrent_ensure_folder() {
        let (_temp_dir, store) = setup_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.ensure_folder("race"))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
        assert_eq!(store.list_folders().unwrap(), vec!["race"]);
    }
}
