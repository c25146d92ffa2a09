use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Error;
use crate::shotlog::ShotLog;

/// Scanned frame extensions the batch will pick up.
const FRAME_EXTENSIONS: &[&str] = &["tif", "tiff", "jpg", "jpeg"];

/// Width of the zero-padded index prefix in a scan filename stem.
const INDEX_WIDTH: usize = 4;

/// Derive the frame index from a scanned file's name.
///
/// Scanner naming convention: the stem starts with an optional underscore,
/// an optional single-letter roll marker, then a zero-padded frame number
/// (`A0001.tif`, `_B0023.jpg`, `0007.tiff` all work). Fails with
/// [`Error::UnindexableFilename`] when no number can be derived — callers
/// skip the file and keep going.
pub fn frame_index(path: &Path) -> Result<u32, Error> {
    let unindexable = || {
        Error::UnindexableFilename(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        )
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(unindexable)?;

    let trimmed = stem.strip_prefix('_').unwrap_or(stem);
    let trimmed = match trimmed.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => &trimmed[c.len_utf8()..],
        _ => trimmed,
    };

    let digits: String = trimmed.chars().take(INDEX_WIDTH).collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(unindexable());
    }

    digits.parse::<u32>().map_err(|_| unindexable())
}

/// Collect frame files from the negatives directory (non-recursive).
///
/// Returns the paths sorted by filename so downstream launch order is
/// deterministic. Fails with [`Error::MissingDirectory`] when the
/// directory does not exist.
pub fn collect_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::MissingDirectory(dir.to_path_buf()).into());
    }

    let mut frames: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file() && is_frame_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    frames.sort();
    Ok(frames)
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// The outcome of matching frame files against a shot log.
#[derive(Debug, Default)]
pub struct MatchReport {
    /// Frame index → every file sharing that index (master + derivatives).
    pub matched: BTreeMap<u32, Vec<PathBuf>>,
    /// Files whose index has no exposure record.
    pub unmatched: Vec<PathBuf>,
    /// Files with no derivable index at all.
    pub unindexed: Vec<PathBuf>,
}

/// Associate each frame file with its exposure record by index.
///
/// Files that cannot be indexed or have no record are reported and
/// excluded — never fatal. Records with no frame on disk are simply
/// skipped.
pub fn match_frames(files: &[PathBuf], log: &ShotLog) -> MatchReport {
    let mut report = MatchReport::default();

    for file in files {
        let index = match frame_index(file) {
            Ok(index) => index,
            Err(e) => {
                log::warn!("Skipping {}: {e}", file.display());
                report.unindexed.push(file.clone());
                continue;
            }
        };
        log::debug!("File '{}' has index {index}", file.display());

        if log.record(index).is_none() {
            log::error!(
                "{}",
                Error::UnmatchedFrame {
                    index,
                    path: file.clone(),
                }
            );
            report.unmatched.push(file.clone());
            continue;
        }

        report.matched.entry(index).or_default().push(file.clone());
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shotlog::ShotLog;
    use std::fs;
    use tempfile::TempDir;

    // ── frame_index ──────────────────────────────────────────────────

    #[test]
    fn index_with_letter_marker() {
        assert_eq!(frame_index(Path::new("A0001.tif")).unwrap(), 1);
        assert_eq!(frame_index(Path::new("B0023.jpg")).unwrap(), 23);
    }

    #[test]
    fn index_with_leading_underscore() {
        assert_eq!(frame_index(Path::new("_A0001.tif")).unwrap(), 1);
        assert_eq!(frame_index(Path::new("_0042.tif")).unwrap(), 42);
    }

    #[test]
    fn index_bare_digits() {
        assert_eq!(frame_index(Path::new("0007.tiff")).unwrap(), 7);
        assert_eq!(frame_index(Path::new("/scans/roll3/0007.tiff")).unwrap(), 7);
    }

    #[test]
    fn index_ignores_trailing_suffix() {
        // Only the fixed-width prefix counts.
        assert_eq!(frame_index(Path::new("A0012_master.tif")).unwrap(), 12);
    }

    #[test]
    fn same_stem_different_extension_same_index() {
        let a = frame_index(Path::new("A0001.tif")).unwrap();
        let b = frame_index(Path::new("A0001.jpg")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unindexable_names_error() {
        for name in ["notes.txt", "scan.tif", "A.tif", "_.jpg", "roll.jpeg"] {
            let err = frame_index(Path::new(name)).unwrap_err();
            assert!(
                matches!(err, Error::UnindexableFilename(_)),
                "expected UnindexableFilename for {name}"
            );
        }
    }

    // ── collect_frames ───────────────────────────────────────────────

    #[test]
    fn collects_only_frame_extensions_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["A0002.jpg", "A0001.tif", "notes.txt", "A0001.xmp"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }

        let frames = collect_frames(dir.path()).unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["A0001.tif", "A0002.jpg"]);
    }

    #[test]
    fn collect_is_not_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("previews");
        fs::create_dir(&sub).unwrap();
        fs::write(dir.path().join("A0001.tif"), b"x").unwrap();
        fs::write(sub.join("A0001.jpg"), b"x").unwrap();

        let frames = collect_frames(dir.path()).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn missing_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = collect_frames(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MissingDirectory(_))
        ));
    }

    // ── match_frames ─────────────────────────────────────────────────

    fn two_record_log() -> ShotLog {
        ShotLog::parse("5.6\t1/500\n8\t1/250\n")
    }

    #[test]
    fn groups_files_by_shared_index() {
        let files = vec![
            PathBuf::from("A0001.tif"),
            PathBuf::from("A0001.jpg"),
            PathBuf::from("A0002.tif"),
        ];
        let report = match_frames(&files, &two_record_log());

        assert_eq!(report.matched.len(), 2);
        assert_eq!(report.matched[&1].len(), 2);
        assert_eq!(report.matched[&2].len(), 1);
        assert!(report.unmatched.is_empty());
        assert!(report.unindexed.is_empty());
    }

    #[test]
    fn frame_without_record_is_reported_not_fatal() {
        let files = vec![PathBuf::from("A0001.tif"), PathBuf::from("A0003.tif")];
        let report = match_frames(&files, &two_record_log());

        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.unmatched, vec![PathBuf::from("A0003.tif")]);
    }

    #[test]
    fn unindexable_file_is_skipped() {
        let files = vec![PathBuf::from("scan.tif"), PathBuf::from("A0001.tif")];
        let report = match_frames(&files, &two_record_log());

        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.unindexed, vec![PathBuf::from("scan.tif")]);
    }

    #[test]
    fn record_without_frame_is_silently_skipped() {
        let files = vec![PathBuf::from("A0002.tif")];
        let report = match_frames(&files, &two_record_log());

        assert_eq!(report.matched.len(), 1);
        assert!(report.matched.contains_key(&2));
        assert!(report.unmatched.is_empty());
    }
}
