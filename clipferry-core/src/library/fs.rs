use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use jwalk::WalkDir;

use super::{
    DeletionError, LibraryAccess, LibraryError, PermissionState, ResourceKind, VideoDeleter,
    VideoLibrary, VideoResource, VideoSummary,
};
use crate::probe::DurationProbe;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "avi", "mkv", "webm", "3gp", "mts"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic"];

/// A plain directory treated as the device-local video library.
///
/// Item IDs are the absolute file paths of the primary file. A video file
/// whose stem matches a sibling image is treated as that image's paired
/// video (live-photo style) rather than a standalone item, so the pair
/// migrates as one unit.
pub struct FsVideoLibrary {
    root: PathBuf,
    probe: Arc<dyn DurationProbe>,
}

impl FsVideoLibrary {
    pub fn new(root: PathBuf, probe: Arc<dyn DurationProbe>) -> Self {
        Self { root, probe }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an item ID back to a path, rejecting anything outside the
    /// library root
    fn item_path(&self, id: &str) -> Option<PathBuf> {
        let path = PathBuf::from(id);
        if path.starts_with(&self.root) && path.is_file() {
            Some(path)
        } else {
            None
        }
    }

    /// The file whose bytes make up the item's video payload
    fn payload_path(&self, id: &str) -> Option<PathBuf> {
        let path = self.item_path(id)?;
        if has_extension_in(&path, VIDEO_EXTENSIONS) {
            Some(path)
        } else if has_extension_in(&path, IMAGE_EXTENSIONS) {
            sidecar_video_for(&path)
        } else {
            None
        }
    }

    fn summary_for(&self, path: &Path) -> Option<VideoSummary> {
        let payload = if has_extension_in(path, VIDEO_EXTENSIONS) {
            path.to_path_buf()
        } else if has_extension_in(path, IMAGE_EXTENSIONS) {
            sidecar_video_for(path)?
        } else {
            return None;
        };

        let meta = fs::metadata(path).ok()?;
        let duration_secs = self.probe.duration_secs(&payload).unwrap_or(0.0);

        Some(VideoSummary {
            id: path.to_string_lossy().to_string(),
            created_at: created_at(&meta),
            duration_secs,
            // Frame decoding is out of scope for the fs library
            pixel_width: 0,
            pixel_height: 0,
        })
    }

    /// Whether `path` should appear as a library item at all
    fn is_item(path: &Path) -> bool {
        if has_extension_in(path, VIDEO_EXTENSIONS) {
            // Sidecars belong to their image item
            image_sibling_for(path).is_none()
        } else if has_extension_in(path, IMAGE_EXTENSIONS) {
            sidecar_video_for(path).is_some()
        } else {
            false
        }
    }
}

impl VideoLibrary for FsVideoLibrary {
    fn list_videos(&self) -> Result<Vec<VideoSummary>, LibraryError> {
        if !self.root.is_dir() {
            return Err(LibraryError::NotADirectory(self.root.clone()));
        }

        let mut videos = Vec::new();
        for entry in WalkDir::new(&self.root).skip_hidden(true).sort(false) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("library scan skipped an entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !Self::is_item(&path) {
                continue;
            }
            if let Some(summary) = self.summary_for(&path) {
                videos.push(summary);
            }
        }

        // Newest first, unknown dates at the bottom, path as a stable tie-break
        videos.sort_by(|a, b| match (b.created_at, a.created_at) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (None, None) => a.id.cmp(&b.id),
        });

        log::debug!("library scan found {} videos under {}", videos.len(), self.root.display());
        Ok(videos)
    }

    fn fetch_videos(&self, ids: &[String]) -> Vec<VideoSummary> {
        ids.iter()
            .filter_map(|id| self.item_path(id))
            .filter(|p| Self::is_item(p))
            .filter_map(|p| self.summary_for(&p))
            .collect()
    }

    fn file_sizes(&self, ids: &[String]) -> HashMap<String, u64> {
        let mut out = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(payload) = self.payload_path(id)
                && let Ok(meta) = fs::metadata(&payload)
                && meta.len() > 0
            {
                out.insert(id.clone(), meta.len());
            }
        }
        out
    }

    fn resources(&self, id: &str) -> Vec<VideoResource> {
        let Some(path) = self.item_path(id) else {
            return Vec::new();
        };

        if has_extension_in(&path, VIDEO_EXTENSIONS) {
            vec![VideoResource {
                kind: ResourceKind::Video,
                original_filename: filename_of(&path),
            }]
        } else if has_extension_in(&path, IMAGE_EXTENSIONS)
            && let Some(sidecar) = sidecar_video_for(&path)
        {
            vec![
                VideoResource {
                    kind: ResourceKind::Photo,
                    original_filename: filename_of(&path),
                },
                VideoResource {
                    kind: ResourceKind::PairedVideo,
                    original_filename: filename_of(&sidecar),
                },
            ]
        } else {
            Vec::new()
        }
    }

    fn export_resource(
        &self,
        id: &str,
        resource: &VideoResource,
        dest: &Path,
    ) -> Result<(), LibraryError> {
        let source = match resource.kind {
            ResourceKind::Video => self.item_path(id),
            ResourceKind::PairedVideo => self
                .item_path(id)
                .as_deref()
                .and_then(sidecar_video_for),
            ResourceKind::Photo => {
                return Err(LibraryError::ExportFailed(
                    "still images are not exportable".into(),
                ));
            }
        };

        let Some(source) = source else {
            return Err(LibraryError::ItemNotFound(id.to_string()));
        };

        fs::copy(&source, dest)
            .map_err(|e| LibraryError::ExportFailed(format!("{}: {e}", source.display())))?;
        Ok(())
    }
}

impl VideoDeleter for FsVideoLibrary {
    fn delete_videos(&self, ids: &[String]) -> Result<(), DeletionError> {
        let mut unique: Vec<&String> = ids.iter().collect();
        unique.sort();
        unique.dedup();

        let mut existing: Vec<PathBuf> = Vec::new();
        for id in &unique {
            let Some(path) = self.item_path(id) else {
                continue;
            };
            // A paired item's ID is the image; the video payload goes
            // with it, never left to resurface as a standalone item
            if has_extension_in(&path, IMAGE_EXTENSIONS)
                && let Some(sidecar) = sidecar_video_for(&path)
            {
                existing.push(sidecar);
            }
            existing.push(path);
        }
        existing.sort();
        existing.dedup();
        if existing.is_empty() {
            return Err(DeletionError::NothingToDelete);
        }

        for path in &existing {
            fs::remove_file(path)
                .map_err(|e| DeletionError::Failed(format!("{}: {e}", path.display())))?;
        }
        Ok(())
    }
}

impl LibraryAccess for FsVideoLibrary {
    fn status(&self) -> PermissionState {
        if !self.root.exists() {
            return PermissionState::Denied;
        }
        match fs::read_dir(&self.root) {
            Ok(_) => PermissionState::Authorized,
            Err(_) => PermissionState::Restricted,
        }
    }

    fn request_access(&self) -> PermissionState {
        // Plain filesystems have no grant dialog; re-checking is the
        // closest equivalent
        self.status()
    }
}

fn has_extension_in(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| extensions.contains(&e.as_str()))
}

fn filename_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Same-stem video sibling of an image file, if any
fn sidecar_video_for(image_path: &Path) -> Option<PathBuf> {
    sibling_with_extension_in(image_path, VIDEO_EXTENSIONS)
}

/// Same-stem image sibling of a video file, if any
fn image_sibling_for(video_path: &Path) -> Option<PathBuf> {
    sibling_with_extension_in(video_path, IMAGE_EXTENSIONS)
}

fn sibling_with_extension_in(path: &Path, extensions: &[&str]) -> Option<PathBuf> {
    let stem = path.file_stem()?;
    let dir = path.parent()?;
    for ext in extensions {
        // Append rather than with_extension: a dotted stem like
        // `holiday.2` must keep its suffix, not have it swapped out
        let candidate = dir.join(format!("{}.{ext}", stem.to_string_lossy()));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn created_at(meta: &fs::Metadata) -> Option<DateTime<Utc>> {
    let time: SystemTime = meta.created().or_else(|_| meta.modified()).ok()?;
    Some(DateTime::<Utc>::from(time))
}
