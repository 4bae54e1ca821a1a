use std::path::PathBuf;

use color_eyre::Result;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};

use clipferry_core::selection::{self, MonthKey};
use clipferry_core::{ExternalFolder, MigrationSession, SortMode};

use crate::views;

pub fn run(session: &mut MigrationSession) -> Result<()> {
    loop {
        println!();
        views::print_status(session);

        let items = [
            "Scan library",
            "List videos",
            "Pick videos",
            "Select by month",
            "Select largest",
            "Change sort order",
            "Choose destination folder",
            "Migrate selection",
            "Delete migrated originals",
            "History",
            "Quit",
        ];
        let choice = Select::new()
            .with_prompt("clipferry")
            .items(&items)
            .default(0)
            .interact()?;

        match choice {
            0 => scan(session),
            1 => views::print_videos(session),
            2 => pick_videos(session)?,
            3 => select_by_month(session)?,
            4 => select_largest(session)?,
            5 => change_sort(session)?,
            6 => choose_folder(session)?,
            7 => migrate(session)?,
            8 => delete_originals(session)?,
            9 => show_history(session)?,
            _ => break,
        }
    }
    Ok(())
}

fn scan(session: &mut MigrationSession) {
    match session.scan() {
        Ok(count) => println!("Scanned {count} videos."),
        Err(e) => eprintln!("{e}"),
    }
}

fn pick_videos(session: &mut MigrationSession) -> Result<()> {
    if session.videos.is_empty() {
        println!("No videos scanned yet.");
        return Ok(());
    }

    let rows: Vec<(String, String)> = session
        .display_videos()
        .iter()
        .map(|v| (v.id.clone(), views::video_label(session, v)))
        .collect();
    let ordered: Vec<&String> = rows.iter().map(|(id, _)| id).collect();
    let labels: Vec<&String> = rows.iter().map(|(_, label)| label).collect();
    let defaults: Vec<bool> = ordered.iter().map(|id| session.is_selected(id)).collect();

    let chosen = MultiSelect::new()
        .with_prompt("Videos to migrate (space toggles, enter confirms)")
        .items(&labels)
        .defaults(&defaults)
        .interact()?;

    session.clear_selection();
    for index in chosen {
        session.toggle_selection(&ordered[index]);
    }
    println!("{} selected.", session.selection_count());
    Ok(())
}

fn select_by_month(session: &mut MigrationSession) -> Result<()> {
    let (groups, unknown) = selection::year_groups(&session.videos);
    if groups.is_empty() && unknown.is_none() {
        println!("No videos scanned yet.");
        return Ok(());
    }

    for group in &groups {
        println!(
            "{}: {} videos across {} months",
            group.year,
            group.total_count(),
            group.months.len()
        );
    }

    let mut labels = Vec::new();
    let mut keys = Vec::new();
    for group in &groups {
        for month in &group.months {
            labels.push(format!("{}  ({} videos)", month.key.display_text(), month.count));
            keys.push(month.key);
        }
    }
    if let Some(summary) = &unknown {
        labels.push(format!("Unknown date  ({} videos)", summary.count));
        keys.push(MonthKey::Unknown);
    }

    let chosen = MultiSelect::new()
        .with_prompt("Months to select")
        .items(&labels)
        .interact()?;
    let months: Vec<MonthKey> = chosen.into_iter().map(|i| keys[i]).collect();

    let count = session.apply_month_rule(&months);
    println!("{count} videos selected.");
    Ok(())
}

fn select_largest(session: &mut MigrationSession) -> Result<()> {
    if session.videos.is_empty() {
        println!("No videos scanned yet.");
        return Ok(());
    }

    let n: usize = Input::new()
        .with_prompt("How many of the largest videos")
        .default(10)
        .interact_text()?;
    let count = session.apply_top_n_rule(n);
    if count < n {
        println!("{count} videos selected; only videos with a known size qualify.");
    } else {
        println!("{count} videos selected.");
    }
    Ok(())
}

fn change_sort(session: &mut MigrationSession) -> Result<()> {
    let modes = [SortMode::DateDesc, SortMode::SizeDesc, SortMode::SizeAsc];
    let labels: Vec<&str> = modes.iter().map(|m| m.label()).collect();
    let choice = Select::new()
        .with_prompt("Sort order")
        .items(&labels)
        .default(0)
        .interact()?;
    session.set_sort_mode(modes[choice]);
    Ok(())
}

fn choose_folder(session: &mut MigrationSession) -> Result<()> {
    let path: String = Input::new()
        .with_prompt("Destination folder path")
        .interact_text()?;

    match ExternalFolder::new(PathBuf::from(path.trim())) {
        Ok(folder) => {
            session.set_folder(folder)?;
            if session.folder_writable {
                println!("Folder saved and writable.");
            } else {
                println!("Folder saved, but it did not accept a test write.");
            }
        }
        Err(e) => eprintln!("{e}"),
    }
    Ok(())
}

fn migrate(session: &mut MigrationSession) -> Result<()> {
    session.rescan_folder_access();
    if session.folder.is_some() && !session.folder_writable {
        println!("Warning: the destination folder did not accept a test write.");
    }

    let run = match session.start_migration() {
        Ok(run) => run,
        Err(e) => {
            eprintln!("{e}");
            return Ok(());
        }
    };

    let bar = ProgressBar::new(run.total as u64);
    bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {wide_msg}")?);
    for progress in run.progress.iter() {
        if progress.is_indeterminate {
            if let Some(name) = &progress.current_filename {
                bar.set_message(format!("copying {name}"));
            }
        } else {
            bar.set_position(progress.completed as u64);
        }
    }
    bar.finish_and_clear();

    let result = session.finish_migration(run)?;
    views::print_result(&result);
    Ok(())
}

fn delete_originals(session: &mut MigrationSession) -> Result<()> {
    let count = session.deletable_count();
    if count == 0 {
        println!("Nothing to delete.");
        return Ok(());
    }

    println!("This deletes the {count} originals that were migrated and verified in the last run.");
    let answer: String = Input::new()
        .with_prompt("Type 'delete' to confirm")
        .allow_empty(true)
        .interact_text()?;
    if answer.trim() != "delete" {
        println!("Cancelled.");
        return Ok(());
    }

    match session.delete_migrated_originals() {
        Ok(count) => println!("Deleted {count} originals."),
        Err(e) => eprintln!("{e}"),
    }
    Ok(())
}

fn show_history(session: &mut MigrationSession) -> Result<()> {
    let records = session.history();
    views::print_history(&records);

    if !records.is_empty()
        && Confirm::new()
            .with_prompt("Clear history?")
            .default(false)
            .interact()?
    {
        session.clear_history()?;
        println!("History cleared.");
    }
    Ok(())
}
