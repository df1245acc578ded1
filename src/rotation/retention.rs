//! Disk usage bounding for rotated capture pairs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::output::is_pair_file;

/// Result of one retention pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionOutcome {
    /// Pair files found in the output directory
    pub scanned: usize,
    /// Files deleted
    pub removed: usize,
    /// Files that could not be deleted
    pub failed: usize,
}

/// Deletes the oldest pair files once the directory holds too many.
///
/// The cap is counted in files, `max_pairs * 2`, pcap and sidecar files
/// together. Nothing is deleted until that count is exceeded; then the oldest
/// files are removed until exactly `max_pairs * 2` remain.
pub struct RetentionEnforcer {
    out_dir: PathBuf,
    max_pairs: usize,
}

impl RetentionEnforcer {
    pub fn new(out_dir: impl Into<PathBuf>, max_pairs: usize) -> Self {
        Self {
            out_dir: out_dir.into(),
            max_pairs,
        }
    }

    pub fn max_files(&self) -> usize {
        self.max_pairs.saturating_mul(2)
    }

    /// Run one retention pass. Failures are logged, never returned.
    pub fn enforce(&self) -> RetentionOutcome {
        let files = match list_pair_files(&self.out_dir) {
            Ok(files) => files,
            Err(e) => {
                error!(
                    "Failed to list output directory {}: {}",
                    self.out_dir.display(),
                    e
                );
                return RetentionOutcome::default();
            }
        };

        self.prune(&files)
    }

    /// Delete the oldest of `files` (sorted oldest first) beyond the cap.
    ///
    /// A file that cannot be removed is logged and counted; the rest are
    /// still attempted.
    fn prune(&self, files: &[PathBuf]) -> RetentionOutcome {
        let mut outcome = RetentionOutcome {
            scanned: files.len(),
            ..RetentionOutcome::default()
        };

        let max_files = self.max_files();
        if files.len() <= max_files {
            return outcome;
        }

        let to_remove = files.len() - max_files;
        info!("Pruning {} old files", to_remove);

        for path in &files[..to_remove] {
            match fs::remove_file(path) {
                Ok(()) => outcome.removed += 1,
                Err(e) => {
                    error!("Removing old file failed: {}: {}", path.display(), e);
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }
}

/// Pair files in `dir`, oldest first.
///
/// Basenames embed a UTC timestamp, so name order is chronological.
pub fn list_pair_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if is_pair_file(&name.to_string_lossy()) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch_pairs(dir: &Path, stamps: &[&str]) {
        for stamp in stamps {
            fs::write(dir.join(format!("capture_{}.pcap", stamp)), b"").unwrap();
            fs::write(dir.join(format!("capture_{}.jsonl", stamp)), b"").unwrap();
        }
    }

    fn names(dir: &Path) -> Vec<String> {
        list_pair_files(dir)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_list_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        touch_pairs(dir.path(), &["20260101T000000Z"]);
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::write(dir.path().join("capture_20260101T000000Z.tmp"), b"").unwrap();
        fs::create_dir(dir.path().join("capture_dir.pcap")).unwrap();

        assert_eq!(
            names(dir.path()),
            vec![
                "capture_20260101T000000Z.jsonl",
                "capture_20260101T000000Z.pcap"
            ]
        );
    }

    #[test]
    fn test_under_threshold_deletes_nothing() {
        let dir = TempDir::new().unwrap();
        touch_pairs(dir.path(), &["20260101T000000Z", "20260101T000500Z"]);

        let outcome = RetentionEnforcer::new(dir.path(), 2).enforce();
        assert_eq!(
            outcome,
            RetentionOutcome {
                scanned: 4,
                removed: 0,
                failed: 0
            }
        );
    }

    #[test]
    fn test_prunes_oldest_down_to_double_cap() {
        let dir = TempDir::new().unwrap();
        touch_pairs(
            dir.path(),
            &[
                "20260101T001000Z",
                "20260101T000000Z",
                "20260101T000500Z",
            ],
        );

        let outcome = RetentionEnforcer::new(dir.path(), 2).enforce();
        assert_eq!(outcome.removed, 2);
        assert_eq!(
            names(dir.path()),
            vec![
                "capture_20260101T000500Z.jsonl",
                "capture_20260101T000500Z.pcap",
                "capture_20260101T001000Z.jsonl",
                "capture_20260101T001000Z.pcap",
            ]
        );
    }

    #[test]
    fn test_counts_files_not_pairs() {
        // Without sidecars a cap of 1 pair still keeps two pcap files
        let dir = TempDir::new().unwrap();
        for stamp in ["20260101T000000Z", "20260101T000500Z", "20260101T001000Z"] {
            fs::write(dir.path().join(format!("capture_{}.pcap", stamp)), b"").unwrap();
        }

        let outcome = RetentionEnforcer::new(dir.path(), 1).enforce();
        assert_eq!(outcome.removed, 1);
        assert_eq!(
            names(dir.path()),
            vec![
                "capture_20260101T000500Z.pcap",
                "capture_20260101T001000Z.pcap"
            ]
        );
    }

    #[test]
    fn test_failed_removal_does_not_stop_pruning() {
        let dir = TempDir::new().unwrap();
        touch_pairs(
            dir.path(),
            &["20260101T000000Z", "20260101T000500Z", "20260101T001000Z"],
        );
        let files = list_pair_files(dir.path()).unwrap();

        // The oldest sidecar disappears between listing and pruning
        fs::remove_file(&files[0]).unwrap();

        let outcome = RetentionEnforcer::new(dir.path(), 1).prune(&files);
        assert_eq!(
            outcome,
            RetentionOutcome {
                scanned: 6,
                removed: 3,
                failed: 1
            }
        );
        assert_eq!(
            names(dir.path()),
            vec![
                "capture_20260101T001000Z.jsonl",
                "capture_20260101T001000Z.pcap"
            ]
        );
    }

    #[test]
    fn test_missing_directory_is_logged_not_raised() {
        let dir = TempDir::new().unwrap();
        let outcome = RetentionEnforcer::new(dir.path().join("gone"), 1).enforce();
        assert_eq!(outcome, RetentionOutcome::default());
    }
}
