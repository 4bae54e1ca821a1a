use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0} is not a folder")]
    NotAFolder(PathBuf),
    #[error("Saved external folder permission expired. Please select the folder again.")]
    PermissionExpired,
    #[error("Selected external folder is not writable.")]
    NotWritable,
}

#[derive(Debug, thiserror::Error)]
pub enum BookmarkError {
    #[error("no external folder has been chosen yet")]
    Missing,
    #[error("saved external folder {} no longer exists", .0.display())]
    Stale(PathBuf),
    #[error("bookmark file is unreadable: {0}")]
    Io(#[from] io::Error),
    #[error("bookmark file is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

/// Handle to the user-chosen destination folder on external storage.
///
/// All I/O against the folder goes through an acquired [`FolderAccess`]
/// guard, mirroring scoped-permission storage where access must be
/// bracketed. On a plain filesystem acquisition is a liveness re-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalFolder {
    path: PathBuf,
}

impl ExternalFolder {
    pub fn new(path: PathBuf) -> Result<Self, StorageError> {
        if path.is_dir() {
            Ok(Self { path })
        } else {
            Err(StorageError::NotAFolder(path))
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Short name for display and history records, never the full path
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    /// Begin scoped access. The guard must stay alive for as long as the
    /// folder is read or written; access ends when it drops.
    pub fn acquire(&self) -> Result<FolderAccess, StorageError> {
        if self.path.is_dir() {
            log::trace!("acquired access to {}", self.path.display());
            Ok(FolderAccess {
                dir: self.path.clone(),
            })
        } else {
            Err(StorageError::PermissionExpired)
        }
    }
}

/// Live scoped access to an [`ExternalFolder`]. Released on drop, on every
/// exit path.
#[derive(Debug)]
pub struct FolderAccess {
    dir: PathBuf,
}

impl FolderAccess {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for FolderAccess {
    fn drop(&mut self) {
        log::trace!("released access to {}", self.dir.display());
    }
}

/// Write and remove a throwaway marker to prove the folder accepts writes
pub fn probe_writable(access: &FolderAccess) -> bool {
    let marker = access
        .dir()
        .join(format!(".clipferry-probe-{}", Uuid::new_v4()));
    match fs::write(&marker, b"probe") {
        Ok(()) => {
            let _ = fs::remove_file(&marker);
            true
        }
        Err(e) => {
            log::debug!("write probe failed in {}: {e}", access.dir().display());
            false
        }
    }
}

/// Persists which external folder the user picked, across sessions
pub trait BookmarkStore: Send + Sync {
    fn save(&self, folder: &ExternalFolder) -> Result<(), BookmarkError>;
    fn resolve(&self) -> Result<ExternalFolder, BookmarkError>;
    fn validate_writable(&self, folder: &ExternalFolder) -> bool;
}

#[derive(Serialize, Deserialize)]
struct SavedFolder {
    path: PathBuf,
}

/// Bookmark persistence as a small JSON file
pub struct FsBookmarkStore {
    path: PathBuf,
}

impl FsBookmarkStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl BookmarkStore for FsBookmarkStore {
    fn save(&self, folder: &ExternalFolder) -> Result<(), BookmarkError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let saved = SavedFolder {
            path: folder.path().to_path_buf(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&saved)?)?;
        log::debug!("saved external folder bookmark: {}", folder.path().display());
        Ok(())
    }

    fn resolve(&self) -> Result<ExternalFolder, BookmarkError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(BookmarkError::Missing),
            Err(e) => return Err(BookmarkError::Io(e)),
        };
        let saved: SavedFolder = serde_json::from_str(&raw)?;
        ExternalFolder::new(saved.path.clone()).map_err(|_| BookmarkError::Stale(saved.path))
    }

    fn validate_writable(&self, folder: &ExternalFolder) -> bool {
        match folder.acquire() {
            Ok(access) => probe_writable(&access),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_external_folder_rejects_plain_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(
            ExternalFolder::new(file),
            Err(StorageError::NotAFolder(_))
        ));
    }

    #[test]
    fn test_acquire_fails_once_folder_is_gone() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dest");
        fs::create_dir(&dir).unwrap();
        let folder = ExternalFolder::new(dir.clone()).unwrap();

        fs::remove_dir(&dir).unwrap();
        assert!(matches!(
            folder.acquire(),
            Err(StorageError::PermissionExpired)
        ));
    }

    #[test]
    fn test_probe_leaves_no_marker_behind() {
        let temp = TempDir::new().unwrap();
        let folder = ExternalFolder::new(temp.path().to_path_buf()).unwrap();
        let access = folder.acquire().unwrap();

        assert!(probe_writable(&access));
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_fails_on_readonly_folder() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("dest");
        fs::create_dir(&dir).unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();

        let folder = ExternalFolder::new(dir.clone()).unwrap();
        let access = folder.acquire().unwrap();
        assert!(!probe_writable(&access));

        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_bookmark_roundtrip() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let store = FsBookmarkStore::new(temp.path().join("bookmark.json"));
        let folder = ExternalFolder::new(dest.clone()).unwrap();
        store.save(&folder).unwrap();

        let resolved = store.resolve().unwrap();
        assert_eq!(resolved.path(), dest.as_path());
        assert!(store.validate_writable(&resolved));
    }

    #[test]
    fn test_bookmark_missing() {
        let temp = TempDir::new().unwrap();
        let store = FsBookmarkStore::new(temp.path().join("bookmark.json"));
        assert!(matches!(store.resolve(), Err(BookmarkError::Missing)));
    }

    #[test]
    fn test_bookmark_stale_when_folder_removed() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let store = FsBookmarkStore::new(temp.path().join("bookmark.json"));
        store
            .save(&ExternalFolder::new(dest.clone()).unwrap())
            .unwrap();
        fs::remove_dir(&dest).unwrap();

        assert!(matches!(store.resolve(), Err(BookmarkError::Stale(_))));
    }
}
