use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender};
use uuid::Uuid;

use super::validate::validate_staged;
use super::{MigrationItemFailure, MigrationItemSuccess, MigrationProgress, MigrationRunResult};
use crate::library::{ResourceKind, VideoLibrary, VideoResource, VideoSummary};
use crate::probe::DurationProbe;
use crate::storage::{ExternalFolder, FolderAccess, StorageError, probe_writable};

const ITEM_NOT_FOUND: &str = "Selected video could not be found in the video library.";
const NO_EXPORTABLE_RESOURCE: &str = "No exportable video resource found for this item.";
const DEFAULT_EXTENSION: &str = "mov";

/// Sequential export pipeline: stage, validate, relocate, one item at a
/// time. One engine value drives one run.
pub struct MigrationEngine {
    library: Arc<dyn VideoLibrary>,
    probe: Arc<dyn DurationProbe>,
    staging_base: PathBuf,
}

impl MigrationEngine {
    pub fn new(library: Arc<dyn VideoLibrary>, probe: Arc<dyn DurationProbe>) -> Self {
        Self {
            library,
            probe,
            staging_base: std::env::temp_dir(),
        }
    }

    pub fn with_staging_dir(mut self, dir: PathBuf) -> Self {
        self.staging_base = dir;
        self
    }

    /// Run the migration on a background thread.
    ///
    /// Returns a receiver for progress snapshots and a handle resolving to
    /// the terminal result. The two are deliberately separate so a caller
    /// can render live progress without caring when or how the run ends.
    pub fn migrate(
        self,
        asset_ids: Vec<String>,
        folder: ExternalFolder,
    ) -> (
        Receiver<MigrationProgress>,
        std::thread::JoinHandle<MigrationRunResult>,
    ) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = std::thread::spawn(move || self.migrate_sync(asset_ids, folder, tx));
        (rx, handle)
    }

    fn migrate_sync(
        self,
        asset_ids: Vec<String>,
        folder: ExternalFolder,
        tx: Sender<MigrationProgress>,
    ) -> MigrationRunResult {
        if asset_ids.is_empty() {
            log::debug!("migration requested with no items, nothing to do");
            return MigrationRunResult::default();
        }

        // Access is acquired once and held for the whole run. A failure
        // here is systemic, so no item is attempted.
        let access = match folder.acquire() {
            Ok(access) => access,
            Err(e) => {
                log::warn!("migration aborted: {e}");
                return MigrationRunResult::all_failed(&asset_ids, &e.to_string());
            }
        };

        if !probe_writable(&access) {
            log::warn!("migration aborted: destination rejected the write probe");
            return MigrationRunResult::all_failed(
                &asset_ids,
                &StorageError::NotWritable.to_string(),
            );
        }

        let fetched = self.library.fetch_videos(&asset_ids);
        if fetched.is_empty() {
            log::warn!("migration aborted: none of the requested items resolved");
            return MigrationRunResult::all_failed(&asset_ids, ITEM_NOT_FOUND);
        }
        let by_id: HashMap<&str, &VideoSummary> =
            fetched.iter().map(|v| (v.id.as_str(), v)).collect();

        let staging = match Staging::create(&self.staging_base) {
            Ok(staging) => staging,
            Err(e) => {
                log::warn!("migration aborted: could not prepare staging area: {e}");
                return MigrationRunResult::all_failed(
                    &asset_ids,
                    &format!("Export failed: could not prepare staging area: {e}"),
                );
            }
        };

        let run_started = Utc::now();
        let total = asset_ids.len();
        let mut result = MigrationRunResult::default();

        log::info!("migrating {total} items to {}", folder.display_name());
        let _ = tx.send(MigrationProgress::starting(total));

        for (index, asset_id) in asset_ids.iter().enumerate() {
            let (display_name, outcome) = match by_id.get(asset_id.as_str()) {
                Some(video) => {
                    self.process_item(video, index, total, &staging, &access, run_started, &tx)
                }
                None => (None, Err(ITEM_NOT_FOUND.to_string())),
            };

            match outcome {
                Ok(success) => {
                    log::debug!(
                        "migrated {asset_id} to {} ({} bytes)",
                        success.destination.display(),
                        success.bytes
                    );
                    result.successes.push(success);
                }
                Err(message) => {
                    log::warn!("item {asset_id} failed: {message}");
                    result.failures.push(MigrationItemFailure {
                        asset_id: asset_id.clone(),
                        message,
                    });
                }
            }

            let _ = tx.send(MigrationProgress {
                completed: index + 1,
                total,
                current_filename: display_name,
                is_indeterminate: false,
            });
        }

        log::info!(
            "migration finished: {} succeeded, {} failed",
            result.success_count(),
            result.failure_count()
        );
        result
    }

    /// Steps a-e for a single resolved item. Returns the display name (when
    /// a resource was found) alongside the outcome so the caller can label
    /// the trailing progress event.
    #[allow(clippy::too_many_arguments)]
    fn process_item(
        &self,
        video: &VideoSummary,
        index: usize,
        total: usize,
        staging: &Staging,
        access: &FolderAccess,
        run_started: DateTime<Utc>,
        tx: &Sender<MigrationProgress>,
    ) -> (Option<String>, Result<MigrationItemSuccess, String>) {
        let resources = self.library.resources(&video.id);
        let Some(resource) = primary_resource(&resources) else {
            return (None, Err(NO_EXPORTABLE_RESOURCE.to_string()));
        };
        let display_name = resource.original_filename.clone();

        let _ = tx.send(MigrationProgress {
            completed: index,
            total,
            current_filename: Some(display_name.clone()),
            is_indeterminate: true,
        });

        let outcome = self.transfer_item(video, resource, index, staging, access, run_started);
        (Some(display_name), outcome)
    }

    fn transfer_item(
        &self,
        video: &VideoSummary,
        resource: &VideoResource,
        index: usize,
        staging: &Staging,
        access: &FolderAccess,
        run_started: DateTime<Utc>,
    ) -> Result<MigrationItemSuccess, String> {
        let staged = staging.path_for(index, &resource.original_filename);
        self.library
            .export_resource(&video.id, resource, &staged)
            .map_err(|e| format!("Export failed: {e}"))?;

        let outcome = (|| {
            let bytes = validate_staged(&staged, video.duration_secs, self.probe.as_ref())?;
            let filename = output_filename(video, run_started, &resource.original_filename);
            let destination = unique_destination(access.dir(), &filename);
            relocate(&staged, &destination).map_err(|e| {
                format!("Could not move the exported file into the destination folder: {e}")
            })?;
            Ok(MigrationItemSuccess {
                asset_id: video.id.clone(),
                destination,
                bytes,
            })
        })();

        if outcome.is_err() {
            let _ = fs::remove_file(&staged);
        }
        outcome
    }
}

/// The item's transferable payload: a plain video, else its paired video
fn primary_resource(resources: &[VideoResource]) -> Option<&VideoResource> {
    resources
        .iter()
        .find(|r| r.kind == ResourceKind::Video)
        .or_else(|| {
            resources
                .iter()
                .find(|r| r.kind == ResourceKind::PairedVideo)
        })
}

/// Human-sortable output name derived from the creation time, with the
/// run start standing in when the creation time is unknown
fn output_filename(
    video: &VideoSummary,
    run_started: DateTime<Utc>,
    original_filename: &str,
) -> String {
    let stamp = video
        .created_at
        .unwrap_or(run_started)
        .format("%Y%m%d_%H%M%S");
    let extension = Path::new(original_filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("clipferry_{stamp}.{extension}")
}

/// First free destination path for `filename`, counting `_2` upward before
/// resorting to a random suffix. Never reuses an occupied name.
fn unique_destination(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(filename);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| filename.to_string());
    let extension = path.extension().map(|e| e.to_string_lossy().to_string());
    let with_suffix = |suffix: &str| match &extension {
        Some(ext) => format!("{stem}_{suffix}.{ext}"),
        None => format!("{stem}_{suffix}"),
    };

    for n in 2..=9999u32 {
        let candidate = dir.join(with_suffix(&n.to_string()));
        if !candidate.exists() {
            return candidate;
        }
    }
    dir.join(with_suffix(&Uuid::new_v4().to_string()))
}

/// Move a validated staged file into the destination. Tries a plain rename
/// first; across filesystems it copies to a hidden partial file in the
/// destination and renames that into place, so observers of the folder
/// never see a half-written final name.
fn relocate(staged: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(staged, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            log::trace!("rename into destination failed ({rename_err}), copying instead");
            let partial =
                destination.with_file_name(format!(".clipferry-partial-{}", Uuid::new_v4()));
            let copied = (|| {
                let mut src = fs::File::open(staged)?;
                let mut dst = fs::File::create(&partial)?;
                io::copy(&mut src, &mut dst)?;
                dst.sync_all()?;
                fs::rename(&partial, destination)
            })();
            match copied {
                Ok(()) => {
                    let _ = fs::remove_file(staged);
                    Ok(())
                }
                Err(copy_err) => {
                    let _ = fs::remove_file(&partial);
                    Err(copy_err)
                }
            }
        }
    }
}

/// Private per-run scratch directory, removed on drop
struct Staging {
    dir: PathBuf,
}

impl Staging {
    fn create(base: &Path) -> io::Result<Self> {
        let dir = base.join(format!("clipferry-staging-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Index prefix keeps same-named resources apart inside staging
    fn path_for(&self, index: usize, original_filename: &str) -> PathBuf {
        self.dir.join(format!("{index:04}_{original_filename}"))
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            log::debug!("staging cleanup failed for {}: {e}", self.dir.display());
        }
    }
}
