use std::path::Path;

use lofty::file::AudioFile;
use lofty::probe::Probe;

/// Best-effort playable-duration lookup.
///
/// Validation and library scanning both go through this seam so tests can
/// substitute fixed durations without real media fixtures.
pub trait DurationProbe: Send + Sync {
    /// Duration in seconds, or `None` when the file cannot be read as a
    /// media container
    fn duration_secs(&self, path: &Path) -> Option<f64>;
}

/// Probe backed by `lofty`: sniffs the container from file content and
/// decodes only the metadata needed to report a duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct MediaFileProbe;

impl DurationProbe for MediaFileProbe {
    fn duration_secs(&self, path: &Path) -> Option<f64> {
        let probe = Probe::open(path).ok()?.guess_file_type().ok()?;
        let file = match probe.read() {
            Ok(f) => f,
            Err(e) => {
                log::debug!("duration probe failed for {}: {e}", path.display());
                return None;
            }
        };

        let secs = file.properties().duration().as_secs_f64();
        if secs.is_finite() { Some(secs) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_probe_rejects_non_media_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, b"plain text, not a container").unwrap();

        let probe = MediaFileProbe;
        assert_eq!(probe.duration_secs(&path), None);
    }

    #[test]
    fn test_probe_rejects_missing_file() {
        let probe = MediaFileProbe;
        assert_eq!(probe.duration_secs(Path::new("/nonexistent/clip.mp4")), None);
    }
}
