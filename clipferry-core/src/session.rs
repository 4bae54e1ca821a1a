use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;

use crate::format;
use crate::history::{HistoryError, HistoryRecord, HistoryStore};
use crate::library::{
    DeletionError, LibraryAccess, LibraryError, PermissionState, VideoDeleter, VideoLibrary,
    VideoSummary,
};
use crate::migration::{MigrationEngine, MigrationProgress, MigrationRunResult};
use crate::probe::DurationProbe;
use crate::selection::{self, MonthKey, SizeIndex};
use crate::storage::{BookmarkError, BookmarkStore, ExternalFolder};

/// Most size lookups fired off eagerly after a scan when a size-based sort
/// is active; anything beyond resolves lazily
const SIZE_PREFETCH_LIMIT: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Video library access has not been granted.")]
    LibraryNotReadable,

    #[error("No external folder is selected.")]
    NoFolder,

    #[error("No videos are selected.")]
    NothingSelected,

    #[error("A migration is already running.")]
    MigrationInFlight,

    #[error("The migration worker stopped unexpectedly.")]
    WorkerFailed,

    #[error("Deleting originals requires full library access.")]
    DeletionNotAllowed,

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Bookmark(#[from] BookmarkError),

    #[error(transparent)]
    Deletion(#[from] DeletionError),

    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Presentation order of the scanned inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    DateDesc,
    SizeDesc,
    SizeAsc,
}

impl SortMode {
    pub fn label(&self) -> &'static str {
        match self {
            SortMode::DateDesc => "Newest first",
            SortMode::SizeDesc => "Largest first",
            SortMode::SizeAsc => "Smallest first",
        }
    }

    fn wants_sizes(&self) -> bool {
        matches!(self, SortMode::SizeDesc | SortMode::SizeAsc)
    }
}

/// A migration run in flight. Drive `progress` until it closes, then hand
/// the value back to [`MigrationSession::finish_migration`].
pub struct RunningMigration {
    /// Progress snapshots, closed when the run ends
    pub progress: Receiver<MigrationProgress>,
    /// Number of items in the run
    pub total: usize,
    outcome: std::thread::JoinHandle<MigrationRunResult>,
    started_at: DateTime<Utc>,
}

/// One user session: scanned inventory, selection, destination folder and
/// the lifecycle of migration runs against them.
///
/// All mutation goes through `&mut self`, which also serves as the guard
/// the engine itself does not provide: only one run can be in flight.
pub struct MigrationSession {
    library: Arc<dyn VideoLibrary>,
    deleter: Arc<dyn VideoDeleter>,
    access: Arc<dyn LibraryAccess>,
    probe: Arc<dyn DurationProbe>,
    bookmarks: Arc<dyn BookmarkStore>,
    history: Arc<dyn HistoryStore>,

    /// Current library permission grant
    pub permission: PermissionState,
    /// Inventory from the last scan, newest first
    pub videos: Vec<VideoSummary>,
    /// IDs the user marked for migration; always a subset of `videos`
    pub selected_ids: HashSet<String>,
    /// Presentation order for `display_videos`
    pub sort_mode: SortMode,
    /// Known byte sizes, filled in as lookups resolve
    pub sizes: SizeIndex,
    /// Destination folder, restored from the bookmark or picked this session
    pub folder: Option<ExternalFolder>,
    /// Last writability verdict for `folder`
    pub folder_writable: bool,
    /// Terminal result of the most recent run; cleared by scans, new runs
    /// and deletion
    pub last_result: Option<MigrationRunResult>,

    is_migrating: bool,
}

impl MigrationSession {
    pub fn new(
        library: Arc<dyn VideoLibrary>,
        deleter: Arc<dyn VideoDeleter>,
        access: Arc<dyn LibraryAccess>,
        probe: Arc<dyn DurationProbe>,
        bookmarks: Arc<dyn BookmarkStore>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            library,
            deleter,
            access,
            probe,
            bookmarks,
            history,
            permission: PermissionState::NotDetermined,
            videos: Vec::new(),
            selected_ids: HashSet::new(),
            sort_mode: SortMode::DateDesc,
            sizes: SizeIndex::new(),
            folder: None,
            folder_writable: false,
            last_result: None,
            is_migrating: false,
        }
    }

    /// Refresh permission state and restore the bookmarked folder, if any
    pub fn load_initial(&mut self) {
        self.permission = self.access.status();
        match self.bookmarks.resolve() {
            Ok(folder) => {
                self.folder_writable = self.bookmarks.validate_writable(&folder);
                self.folder = Some(folder);
            }
            Err(BookmarkError::Missing) => {}
            Err(e) => {
                log::warn!("saved folder bookmark unusable: {e}");
                self.folder = None;
                self.folder_writable = false;
            }
        }
    }

    pub fn request_access(&mut self) -> PermissionState {
        self.permission = self.access.request_access();
        log::debug!("library access now {}", self.permission.label());
        self.permission
    }

    /// Adopt a destination folder and persist it for future sessions
    pub fn set_folder(&mut self, folder: ExternalFolder) -> Result<(), SessionError> {
        self.bookmarks.save(&folder)?;
        self.folder_writable = self.bookmarks.validate_writable(&folder);
        self.folder = Some(folder);
        Ok(())
    }

    /// Re-check that the current folder still accepts writes
    pub fn rescan_folder_access(&mut self) {
        self.folder_writable = match &self.folder {
            Some(folder) => self.bookmarks.validate_writable(folder),
            None => false,
        };
    }

    /// Scan the library. Replaces the inventory wholesale and drops
    /// everything derived from the previous one: selection, sizes, and the
    /// last run result.
    pub fn scan(&mut self) -> Result<usize, SessionError> {
        if !self.permission.can_read() {
            return Err(SessionError::LibraryNotReadable);
        }

        self.videos = self.library.list_videos()?;
        self.selected_ids.clear();
        self.sizes.clear();
        self.last_result = None;

        if self.sort_mode.wants_sizes() {
            self.prefetch_sizes();
        }
        Ok(self.videos.len())
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort_mode = mode;
        if mode.wants_sizes() {
            self.prefetch_sizes();
        }
    }

    /// Inventory in presentation order. Size sorts keep videos with an
    /// unresolved size at the bottom in their scan order.
    pub fn display_videos(&self) -> Vec<&VideoSummary> {
        let mut out: Vec<&VideoSummary> = self.videos.iter().collect();
        match self.sort_mode {
            SortMode::DateDesc => {}
            SortMode::SizeDesc => out.sort_by(|a, b| self.cmp_sizes(a, b, true)),
            SortMode::SizeAsc => out.sort_by(|a, b| self.cmp_sizes(a, b, false)),
        }
        out
    }

    fn cmp_sizes(&self, a: &VideoSummary, b: &VideoSummary, descending: bool) -> Ordering {
        match (self.sizes.get(&a.id), self.sizes.get(&b.id)) {
            (Some(x), Some(y)) => {
                if descending {
                    y.cmp(x)
                } else {
                    x.cmp(y)
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    fn prefetch_sizes(&mut self) {
        let ids: Vec<String> = self
            .videos
            .iter()
            .map(|v| v.id.clone())
            .filter(|id| !self.sizes.contains_key(id))
            .take(SIZE_PREFETCH_LIMIT)
            .collect();
        self.request_sizes(&ids);
    }

    /// Resolve byte sizes for the given IDs, skipping ones already known.
    /// An ID the library cannot size stays absent and is simply asked
    /// about again on the next request.
    pub fn request_sizes(&mut self, ids: &[String]) {
        let wanted: Vec<String> = ids
            .iter()
            .filter(|id| !self.sizes.contains_key(*id))
            .cloned()
            .collect();
        if wanted.is_empty() {
            return;
        }

        let resolved = self.library.file_sizes(&wanted);
        log::trace!("resolved {} of {} requested sizes", resolved.len(), wanted.len());
        self.sizes.extend(resolved);
    }

    /// Known size or a placeholder while unresolved
    pub fn size_text(&self, id: &str) -> String {
        format::size_text(self.sizes.get(id).copied())
    }

    pub fn toggle_selection(&mut self, id: &str) {
        if !self.selected_ids.remove(id) && self.videos.iter().any(|v| v.id == id) {
            self.selected_ids.insert(id.to_string());
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_ids.contains(id)
    }

    pub fn select_all(&mut self) {
        self.selected_ids = self.videos.iter().map(|v| v.id.clone()).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected_ids.clear();
    }

    pub fn selection_count(&self) -> usize {
        self.selected_ids.len()
    }

    /// Replace the selection with every video in the given months
    pub fn apply_month_rule(&mut self, months: &[MonthKey]) -> usize {
        let ids = selection::asset_ids_for_months(&self.videos, months);
        self.selected_ids = ids.into_iter().collect();
        self.selected_ids.len()
    }

    /// Replace the selection with the N largest videos of known size.
    /// Returns how many actually qualified; a caller seeing fewer than `n`
    /// should surface that as a partial selection, not an error.
    pub fn apply_top_n_rule(&mut self, n: usize) -> usize {
        let all_ids: Vec<String> = self.videos.iter().map(|v| v.id.clone()).collect();
        self.request_sizes(&all_ids);

        let ids = selection::top_n_asset_ids_by_size(&self.videos, &self.sizes, n);
        let count = ids.len();
        self.selected_ids = ids.into_iter().collect();
        count
    }

    pub fn is_migrating(&self) -> bool {
        self.is_migrating
    }

    /// Kick off a migration of the current selection, in scan order.
    ///
    /// Starting a run invalidates the previous run's result, so originals
    /// from an earlier run can no longer be deleted. The returned value
    /// must come back through [`finish_migration`], or the session stays
    /// locked against further runs.
    ///
    /// [`finish_migration`]: MigrationSession::finish_migration
    pub fn start_migration(&mut self) -> Result<RunningMigration, SessionError> {
        if self.is_migrating {
            return Err(SessionError::MigrationInFlight);
        }
        let folder = self.folder.clone().ok_or(SessionError::NoFolder)?;
        if self.selected_ids.is_empty() {
            return Err(SessionError::NothingSelected);
        }

        let ids: Vec<String> = self
            .videos
            .iter()
            .filter(|v| self.selected_ids.contains(&v.id))
            .map(|v| v.id.clone())
            .collect();
        let total = ids.len();

        let engine = MigrationEngine::new(Arc::clone(&self.library), Arc::clone(&self.probe));
        let started_at = Utc::now();
        let (progress, outcome) = engine.migrate(ids, folder);

        self.is_migrating = true;
        self.last_result = None;

        Ok(RunningMigration {
            progress,
            total,
            outcome,
            started_at,
        })
    }

    /// Collect a finished run: store its result, append it to history and
    /// release the single-run guard
    pub fn finish_migration(
        &mut self,
        run: RunningMigration,
    ) -> Result<MigrationRunResult, SessionError> {
        self.is_migrating = false;

        let result = run.outcome.join().map_err(|_| SessionError::WorkerFailed)?;

        let target = self
            .folder
            .as_ref()
            .map(|f| f.display_name())
            .unwrap_or_default();
        let record = HistoryRecord::from_result(&result, &target, run.started_at, Utc::now());
        if let Err(e) = self.history.append(record) {
            log::warn!("could not record migration in history: {e}");
        }

        self.last_result = Some(result.clone());
        Ok(result)
    }

    /// How many originals the last run cleared for deletion
    pub fn deletable_count(&self) -> usize {
        self.last_result
            .as_ref()
            .map(|r| r.success_count())
            .unwrap_or(0)
    }

    /// Delete the originals of exactly the last run's successes. Never
    /// touches the current selection or any earlier run.
    pub fn delete_migrated_originals(&mut self) -> Result<usize, SessionError> {
        if !self.permission.can_delete() {
            return Err(SessionError::DeletionNotAllowed);
        }
        let ids = self
            .last_result
            .as_ref()
            .map(|r| r.success_ids())
            .unwrap_or_default();
        if ids.is_empty() {
            return Err(SessionError::Deletion(DeletionError::NothingToDelete));
        }

        self.deleter.delete_videos(&ids)?;

        let deleted: HashSet<&String> = ids.iter().collect();
        self.videos.retain(|v| !deleted.contains(&v.id));
        self.selected_ids.retain(|id| !deleted.contains(id));
        for id in &ids {
            self.sizes.remove(id);
        }
        self.last_result = None;

        log::info!("deleted {} migrated originals", ids.len());
        Ok(ids.len())
    }

    pub fn history(&self) -> Vec<HistoryRecord> {
        self.history.load()
    }

    pub fn clear_history(&mut self) -> Result<(), SessionError> {
        self.history.clear()?;
        Ok(())
    }
}
