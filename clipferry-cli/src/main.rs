mod menu;
mod views;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;

use clipferry_core::{
    DurationProbe, ExternalFolder, FsBookmarkStore, FsVideoLibrary, JsonHistoryStore,
    MediaFileProbe, MigrationSession, PermissionState,
};

/// clipferry - move videos off a local media library onto external storage
#[derive(Parser, Debug)]
#[command(name = "clipferry")]
#[command(about = "Migrate videos to external storage, verify them, then reclaim the space")]
#[command(version)]
struct Args {
    /// Video library to migrate from
    #[arg(short, long)]
    library: PathBuf,

    /// Destination folder on external storage (otherwise the bookmarked one)
    #[arg(short, long)]
    dest: Option<PathBuf>,

    /// Where the folder bookmark and migration history live
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    // Resolve path
    let library_root = args.library.canonicalize().unwrap_or(args.library.clone());
    if !library_root.is_dir() {
        eprintln!(
            "Error: Library path is not a directory: {}",
            library_root.display()
        );
        std::process::exit(1);
    }

    let config_dir = args
        .config_dir
        .or_else(|| dirs::config_dir().map(|d| d.join("clipferry")))
        .unwrap_or_else(|| PathBuf::from(".clipferry"));

    let probe: Arc<dyn DurationProbe> = Arc::new(MediaFileProbe);
    let library = Arc::new(FsVideoLibrary::new(library_root, Arc::clone(&probe)));

    let mut session = MigrationSession::new(
        library.clone(),
        library.clone(),
        library,
        probe,
        Arc::new(FsBookmarkStore::new(config_dir.join("folder.json"))),
        Arc::new(JsonHistoryStore::new(config_dir.join("history.json"))),
    );
    session.load_initial();

    if let Some(dest) = args.dest {
        session.set_folder(ExternalFolder::new(dest)?)?;
    }

    if session.permission == PermissionState::NotDetermined {
        session.request_access();
    }
    if session.permission.can_read() {
        match session.scan() {
            Ok(count) => println!("Scanned {count} videos."),
            Err(e) => eprintln!("Scan failed: {e}"),
        }
    } else {
        eprintln!("Library access is {}.", session.permission.label());
    }

    menu::run(&mut session)
}
