mod fs;

pub use fs::FsVideoLibrary;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Immutable snapshot of one library video taken at scan time.
///
/// `created_at` is `None` when the library has no usable creation date
/// for the item; such items fall into the `Unknown` month bucket and
/// sort after everything with a real date.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSummary {
    /// Stable opaque identifier, unique within one scan
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Playable duration in seconds, 0.0 when unknown
    pub duration_secs: f64,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl VideoSummary {
    pub fn resolution_text(&self) -> String {
        format!("{}x{}", self.pixel_width, self.pixel_height)
    }
}

/// Kind of transferable payload attached to a library item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Primary video bytes
    Video,
    /// Video half of a photo+video pair (live-photo style sidecar)
    PairedVideo,
    /// Still image; never exported by the migration engine
    Photo,
}

/// One transferable resource of a library item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoResource {
    pub kind: ResourceKind,
    pub original_filename: String,
}

/// Read/delete capability of the current library grant.
///
/// The capability predicates live here so callers never hand-roll
/// their own status checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
    Limited,
}

impl PermissionState {
    /// Whether the library can be scanned and exported from
    pub fn can_read(&self) -> bool {
        matches!(self, PermissionState::Authorized | PermissionState::Limited)
    }

    /// Whether originals may be deleted from the library
    pub fn can_delete(&self) -> bool {
        matches!(self, PermissionState::Authorized)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PermissionState::NotDetermined => "Not Determined",
            PermissionState::Restricted => "Restricted",
            PermissionState::Denied => "Denied",
            PermissionState::Authorized => "Authorized",
            PermissionState::Limited => "Limited",
        }
    }
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Library root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Library item not found: {0}")]
    ItemNotFound(String),

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum DeletionError {
    #[error("Nothing to delete.")]
    NothingToDelete,

    #[error("Delete failed: {0}")]
    Failed(String),
}

/// Read access to the scanned video library.
///
/// Implementations must be cheap to share across threads; the migration
/// engine holds one behind an `Arc` for the lifetime of a run.
pub trait VideoLibrary: Send + Sync {
    /// All videos, sorted by creation date descending (unknown dates last)
    fn list_videos(&self) -> Result<Vec<VideoSummary>, LibraryError>;

    /// Look up specific items; IDs that no longer resolve are absent
    fn fetch_videos(&self, ids: &[String]) -> Vec<VideoSummary>;

    /// Best-effort byte sizes; IDs whose size cannot be determined are absent
    fn file_sizes(&self, ids: &[String]) -> HashMap<String, u64>;

    /// Transferable resources of one item, primary first
    fn resources(&self, id: &str) -> Vec<VideoResource>;

    /// Write the resource's bytes to `dest` (the engine's staging path)
    fn export_resource(
        &self,
        id: &str,
        resource: &VideoResource,
        dest: &Path,
    ) -> Result<(), LibraryError>;
}

/// Wholesale deletion of originals from the library
pub trait VideoDeleter: Send + Sync {
    fn delete_videos(&self, ids: &[String]) -> Result<(), DeletionError>;
}

/// Current and requestable permission grant for the library
pub trait LibraryAccess: Send + Sync {
    fn status(&self) -> PermissionState;

    fn request_access(&self) -> PermissionState;
}
