pub mod format;
pub mod history;
pub mod library;
pub mod migration;
pub mod probe;
pub mod selection;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod testkit;

pub use format::{format_duration, format_size, size_text};
pub use history::{HistoryItem, HistoryItemStatus, HistoryRecord, HistoryStore, JsonHistoryStore};
pub use library::{
    FsVideoLibrary, LibraryAccess, LibraryError, PermissionState, VideoDeleter, VideoLibrary,
    VideoSummary,
};
pub use migration::{
    MigrationEngine, MigrationItemFailure, MigrationItemSuccess, MigrationProgress,
    MigrationRunResult,
};
pub use probe::{DurationProbe, MediaFileProbe};
pub use selection::{MonthIndex, MonthKey, MonthSummary, MonthYearGroup, SizeIndex};
pub use session::{MigrationSession, RunningMigration, SessionError, SortMode};
pub use storage::{BookmarkStore, ExternalFolder, FsBookmarkStore};
