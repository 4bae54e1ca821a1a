//! Shared test doubles for the engine and session tests.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::history::{HistoryError, HistoryRecord, HistoryStore};
use crate::library::{
    DeletionError, LibraryAccess, LibraryError, PermissionState, ResourceKind, VideoDeleter,
    VideoLibrary, VideoResource, VideoSummary,
};
use crate::probe::DurationProbe;
use crate::storage::{BookmarkError, BookmarkStore, ExternalFolder};

/// Minimal summary with the given ID and nothing else known
pub fn video(id: &str) -> VideoSummary {
    VideoSummary {
        id: id.to_string(),
        created_at: None,
        duration_secs: 0.0,
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// Probe returning one fixed answer for every file
pub struct FixedProbe {
    value: Option<f64>,
}

impl FixedProbe {
    pub fn new(secs: f64) -> Self {
        Self { value: Some(secs) }
    }

    pub fn unreadable() -> Self {
        Self { value: None }
    }
}

impl DurationProbe for FixedProbe {
    fn duration_secs(&self, _path: &Path) -> Option<f64> {
        self.value
    }
}

/// Probe reporting a file's byte length as its duration. `MockVideo` keeps
/// `duration_secs` equal to its payload length, so exports validate unless
/// a test deliberately skews one of the two.
pub struct LenProbe;

impl DurationProbe for LenProbe {
    fn duration_secs(&self, path: &Path) -> Option<f64> {
        fs::metadata(path).ok().map(|m| m.len() as f64)
    }
}

pub struct MockVideo {
    pub summary: VideoSummary,
    pub filename: String,
    pub payload: Vec<u8>,
}

impl MockVideo {
    pub fn plain(id: &str, filename: &str) -> Self {
        let payload = b"test-bytes".to_vec();
        let mut summary = video(id);
        summary.duration_secs = payload.len() as f64;
        Self {
            summary,
            filename: filename.to_string(),
            payload,
        }
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.summary.created_at = Some(at);
        self
    }

    pub fn payload(mut self, bytes: &[u8]) -> Self {
        self.payload = bytes.to_vec();
        self.summary.duration_secs = bytes.len() as f64;
        self
    }

    pub fn with_duration(mut self, secs: f64) -> Self {
        self.summary.duration_secs = secs;
        self
    }
}

type ExportHook = Box<dyn FnMut(usize) + Send>;

/// In-memory library covering all three library-facing traits
pub struct MockLibrary {
    videos: Mutex<Vec<MockVideo>>,
    hidden_resources: Mutex<HashSet<String>>,
    failing_exports: Mutex<HashMap<String, String>>,
    unknown_sizes: Mutex<HashSet<String>>,
    size_request_log: Mutex<Vec<Vec<String>>>,
    export_log: Mutex<Vec<String>>,
    export_hook: Mutex<Option<ExportHook>>,
    pub deleted: Mutex<Vec<String>>,
    delete_failure: Mutex<Option<String>>,
    permission: Mutex<PermissionState>,
    grant: Mutex<PermissionState>,
}

impl MockLibrary {
    pub fn new() -> Self {
        Self {
            videos: Mutex::new(Vec::new()),
            hidden_resources: Mutex::new(HashSet::new()),
            failing_exports: Mutex::new(HashMap::new()),
            unknown_sizes: Mutex::new(HashSet::new()),
            size_request_log: Mutex::new(Vec::new()),
            export_log: Mutex::new(Vec::new()),
            export_hook: Mutex::new(None),
            deleted: Mutex::new(Vec::new()),
            delete_failure: Mutex::new(None),
            permission: Mutex::new(PermissionState::Authorized),
            grant: Mutex::new(PermissionState::Authorized),
        }
    }

    pub fn with_video(self, video: MockVideo) -> Self {
        self.videos.lock().unwrap().push(video);
        self
    }

    pub fn add_video(&self, video: MockVideo) {
        self.videos.lock().unwrap().push(video);
    }

    pub fn hide_resources(&self, id: &str) {
        self.hidden_resources.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_export(&self, id: &str, message: &str) {
        self.failing_exports
            .lock()
            .unwrap()
            .insert(id.to_string(), message.to_string());
    }

    pub fn mark_size_unknown(&self, id: &str) {
        self.unknown_sizes.lock().unwrap().insert(id.to_string());
    }

    pub fn set_export_hook(&self, hook: impl FnMut(usize) + Send + 'static) {
        *self.export_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn export_count(&self) -> usize {
        self.export_log.lock().unwrap().len()
    }

    /// Every batch of IDs passed to `file_sizes`, in call order
    pub fn size_requests(&self) -> Vec<Vec<String>> {
        self.size_request_log.lock().unwrap().clone()
    }

    pub fn fail_delete(&self, message: &str) {
        *self.delete_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn set_permission(&self, state: PermissionState) {
        *self.permission.lock().unwrap() = state;
    }

    pub fn set_grant_result(&self, state: PermissionState) {
        *self.grant.lock().unwrap() = state;
    }
}

impl Default for MockLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoLibrary for MockLibrary {
    fn list_videos(&self) -> Result<Vec<VideoSummary>, LibraryError> {
        let mut out: Vec<VideoSummary> = self
            .videos
            .lock()
            .unwrap()
            .iter()
            .map(|v| v.summary.clone())
            .collect();
        out.sort_by(|a, b| match (b.created_at, a.created_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => a.id.cmp(&b.id),
        });
        Ok(out)
    }

    fn fetch_videos(&self, ids: &[String]) -> Vec<VideoSummary> {
        let videos = self.videos.lock().unwrap();
        ids.iter()
            .filter_map(|id| {
                videos
                    .iter()
                    .find(|v| v.summary.id == *id)
                    .map(|v| v.summary.clone())
            })
            .collect()
    }

    fn file_sizes(&self, ids: &[String]) -> HashMap<String, u64> {
        self.size_request_log
            .lock()
            .unwrap()
            .push(ids.to_vec());
        let videos = self.videos.lock().unwrap();
        let unknown = self.unknown_sizes.lock().unwrap();
        let mut out = HashMap::new();
        for id in ids {
            if unknown.contains(id) {
                continue;
            }
            if let Some(v) = videos.iter().find(|v| v.summary.id == *id)
                && !v.payload.is_empty()
            {
                out.insert(id.clone(), v.payload.len() as u64);
            }
        }
        out
    }

    fn resources(&self, id: &str) -> Vec<VideoResource> {
        if self.hidden_resources.lock().unwrap().contains(id) {
            return Vec::new();
        }
        self.videos
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.summary.id == id)
            .map(|v| {
                vec![VideoResource {
                    kind: ResourceKind::Video,
                    original_filename: v.filename.clone(),
                }]
            })
            .unwrap_or_default()
    }

    fn export_resource(
        &self,
        id: &str,
        _resource: &VideoResource,
        dest: &Path,
    ) -> Result<(), LibraryError> {
        let call = {
            let mut log = self.export_log.lock().unwrap();
            log.push(id.to_string());
            log.len()
        };
        if let Some(hook) = self.export_hook.lock().unwrap().as_mut() {
            hook(call);
        }
        if let Some(message) = self.failing_exports.lock().unwrap().get(id) {
            return Err(LibraryError::ExportFailed(message.clone()));
        }
        let videos = self.videos.lock().unwrap();
        let Some(v) = videos.iter().find(|v| v.summary.id == id) else {
            return Err(LibraryError::ItemNotFound(id.to_string()));
        };
        fs::write(dest, &v.payload)?;
        Ok(())
    }
}

impl VideoDeleter for MockLibrary {
    fn delete_videos(&self, ids: &[String]) -> Result<(), DeletionError> {
        if let Some(message) = self.delete_failure.lock().unwrap().clone() {
            return Err(DeletionError::Failed(message));
        }
        let mut videos = self.videos.lock().unwrap();
        let mut removed = Vec::new();
        videos.retain(|v| {
            if ids.contains(&v.summary.id) {
                removed.push(v.summary.id.clone());
                false
            } else {
                true
            }
        });
        if removed.is_empty() {
            return Err(DeletionError::NothingToDelete);
        }
        self.deleted.lock().unwrap().extend(removed);
        Ok(())
    }
}

impl LibraryAccess for MockLibrary {
    fn status(&self) -> PermissionState {
        *self.permission.lock().unwrap()
    }

    fn request_access(&self) -> PermissionState {
        let granted = *self.grant.lock().unwrap();
        *self.permission.lock().unwrap() = granted;
        granted
    }
}

#[derive(Default)]
pub struct MockBookmarks {
    pub saved: Mutex<Option<ExternalFolder>>,
}

impl BookmarkStore for MockBookmarks {
    fn save(&self, folder: &ExternalFolder) -> Result<(), BookmarkError> {
        *self.saved.lock().unwrap() = Some(folder.clone());
        Ok(())
    }

    fn resolve(&self) -> Result<ExternalFolder, BookmarkError> {
        self.saved
            .lock()
            .unwrap()
            .clone()
            .ok_or(BookmarkError::Missing)
    }

    fn validate_writable(&self, folder: &ExternalFolder) -> bool {
        folder.path().is_dir()
    }
}

#[derive(Default)]
pub struct MockHistory {
    pub records: Mutex<Vec<HistoryRecord>>,
}

impl HistoryStore for MockHistory {
    fn load(&self) -> Vec<HistoryRecord> {
        self.records.lock().unwrap().clone()
    }

    fn append(&self, record: HistoryRecord) -> Result<(), HistoryError> {
        self.records.lock().unwrap().insert(0, record);
        Ok(())
    }

    fn clear(&self) -> Result<(), HistoryError> {
        self.records.lock().unwrap().clear();
        Ok(())
    }
}
