use std::path::Path;

use chrono::{DateTime, Utc};

use clipferry_core::{
    HistoryItemStatus, HistoryRecord, MigrationRunResult, MigrationSession, VideoSummary,
    format_duration,
};

pub fn print_status(session: &MigrationSession) {
    let folder = match &session.folder {
        Some(folder) if session.folder_writable => folder.display_name(),
        Some(folder) => format!("{} (not writable)", folder.display_name()),
        None => "none".to_string(),
    };
    println!(
        "Access: {} | {} videos, {} selected ({}) | Folder: {} | Deletable: {}",
        session.permission.label(),
        session.videos.len(),
        session.selection_count(),
        session.sort_mode.label(),
        folder,
        session.deletable_count()
    );
}

pub fn print_videos(session: &MigrationSession) {
    if session.videos.is_empty() {
        println!("No videos scanned yet.");
        return;
    }
    println!("{:>4}     {:16}  {:>8}  {:>10}  name", "#", "created", "length", "size");
    for (index, video) in session.display_videos().iter().enumerate() {
        let marker = if session.is_selected(&video.id) { "*" } else { " " };
        println!(
            "{:>4}  {marker}  {:16}  {:>8}  {:>10}  {}",
            index + 1,
            date_text(video.created_at),
            format_duration(video.duration_secs),
            session.size_text(&video.id),
            short_name(&video.id),
        );
    }
}

pub fn video_label(session: &MigrationSession, video: &VideoSummary) -> String {
    format!(
        "{:16}  {:>8}  {:>10}  {}",
        date_text(video.created_at),
        format_duration(video.duration_secs),
        session.size_text(&video.id),
        short_name(&video.id)
    )
}

pub fn print_result(result: &MigrationRunResult) {
    println!(
        "{} succeeded, {} failed.",
        result.success_count(),
        result.failure_count()
    );
    for success in &result.successes {
        println!(
            "  + {} -> {}",
            short_name(&success.asset_id),
            success.destination.display()
        );
    }
    for failure in &result.failures {
        println!("  ! {}: {}", short_name(&failure.asset_id), failure.message);
    }
}

pub fn print_history(records: &[HistoryRecord]) {
    if records.is_empty() {
        println!("No migrations recorded.");
        return;
    }
    for record in records {
        println!(
            "{}  {}: {} ok, {} failed",
            record.finished_at.format("%Y-%m-%d %H:%M"),
            record.target_folder,
            record.successes,
            record.failures
        );
        for item in record.items.iter().filter(|i| i.status == HistoryItemStatus::Failure) {
            println!(
                "      ! {}: {}",
                short_name(&item.asset_id),
                item.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

fn date_text(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        None => "Unknown".to_string(),
    }
}

fn short_name(id: &str) -> String {
    Path::new(id)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| id.to_string())
}
