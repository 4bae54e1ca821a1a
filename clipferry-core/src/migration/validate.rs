use std::fs;
use std::path::Path;

use crate::probe::DurationProbe;

/// Allowed deviation between the staged file's duration and the library's
/// expectation. Generous for short clips, proportional for long ones.
pub fn duration_tolerance(expected_secs: f64) -> f64 {
    (expected_secs * 0.10).max(2.0)
}

/// Check a staged export before it may enter the destination folder.
///
/// The file must be non-empty and must decode to a playable duration. When
/// the library knows the expected duration the staged duration must fall
/// within [`duration_tolerance`] of it. Returns the verified byte size.
pub fn validate_staged(
    path: &Path,
    expected_duration_secs: f64,
    probe: &dyn DurationProbe,
) -> Result<u64, String> {
    let bytes = fs::metadata(path)
        .map_err(|e| format!("exported file is unreadable: {e}"))?
        .len();
    if bytes == 0 {
        return Err("exported file is empty".to_string());
    }

    let Some(actual) = probe.duration_secs(path) else {
        return Err("exported file has no readable video duration".to_string());
    };
    if actual <= 0.0 {
        return Err("exported file has no playable duration".to_string());
    }

    if expected_duration_secs > 0.0 {
        let tolerance = duration_tolerance(expected_duration_secs);
        let deviation = (actual - expected_duration_secs).abs();
        if deviation > tolerance {
            return Err(format!(
                "exported duration {actual:.1}s is off by {deviation:.1}s from the expected {expected_duration_secs:.1}s"
            ));
        }
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::FixedProbe;
    use tempfile::TempDir;

    #[test]
    fn test_tolerance_floor_is_two_seconds() {
        assert_eq!(duration_tolerance(5.0), 2.0);
        assert_eq!(duration_tolerance(0.0), 2.0);
    }

    #[test]
    fn test_tolerance_scales_for_long_videos() {
        assert_eq!(duration_tolerance(60.0), 6.0);
        assert_eq!(duration_tolerance(600.0), 60.0);
    }

    #[test]
    fn test_empty_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("staged.mov");
        fs::write(&path, b"").unwrap();
        let err = validate_staged(&path, 10.0, &FixedProbe::new(10.0)).unwrap_err();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_unreadable_duration_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("staged.mov");
        fs::write(&path, b"bytes").unwrap();
        let err = validate_staged(&path, 10.0, &FixedProbe::unreadable()).unwrap_err();
        assert!(err.contains("no readable"));
    }

    #[test]
    fn test_duration_outside_tolerance_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("staged.mov");
        fs::write(&path, b"bytes").unwrap();
        // 12.5s against an expected 10.0s exceeds the 2.0s floor
        let err = validate_staged(&path, 10.0, &FixedProbe::new(12.5)).unwrap_err();
        assert!(err.contains("off by"));
    }

    #[test]
    fn test_duration_within_tolerance_passes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("staged.mov");
        fs::write(&path, b"bytes").unwrap();
        let bytes = validate_staged(&path, 10.0, &FixedProbe::new(11.5)).unwrap();
        assert_eq!(bytes, 5);
    }

    #[test]
    fn test_duration_at_tolerance_boundary_passes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("staged.mov");
        fs::write(&path, b"bytes").unwrap();
        // The band is inclusive: off by exactly the 2.0s floor passes
        assert!(validate_staged(&path, 10.0, &FixedProbe::new(12.0)).is_ok());
        // Likewise at the proportional edge, 4.0s on a 40.0s clip
        assert!(validate_staged(&path, 40.0, &FixedProbe::new(44.0)).is_ok());
    }

    #[test]
    fn test_unknown_expected_duration_skips_comparison() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("staged.mov");
        fs::write(&path, b"bytes").unwrap();
        assert!(validate_staged(&path, 0.0, &FixedProbe::new(42.0)).is_ok());
    }
}
