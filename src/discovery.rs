//! Input file discovery
//!
//! Each source is a directory that operators drop fresh exports into. The
//! newest file matching the source's glob wins, as long as it is not older
//! than the freshness threshold.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Local};
use globset::Glob;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Freshness policy applied to discovered input files
#[derive(Debug, Clone, Copy)]
pub struct Freshness {
    pub max_age: Duration,
    pub now: DateTime<Local>,
}

impl Freshness {
    pub fn days(days: u32) -> Self {
        Self {
            max_age: Duration::days(i64::from(days)),
            now: Local::now(),
        }
    }

    /// Whether a file modified at `modified` is recent enough
    pub fn accepts(&self, modified: DateTime<Local>) -> bool {
        self.now.signed_duration_since(modified) <= self.max_age
    }
}

/// Modification time of a file, in local time
pub fn modified_at(path: &Path) -> Result<DateTime<Local>> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified))
}

/// Find the most recently modified file in `dir` whose name matches `pattern`.
///
/// Returns `Ok(None)` when the directory is missing, nothing matches, or
/// every match is stale. Subdirectories are not searched. Only an invalid
/// pattern is an error.
pub fn find_latest_file(dir: &Path, pattern: &str, freshness: &Freshness) -> Result<Option<PathBuf>> {
    let matcher = Glob::new(pattern)?.compile_matcher();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "input directory not readable");
            return Ok(None);
        }
    };

    let mut latest: Option<(DateTime<Local>, PathBuf)> = None;
    let mut stale = 0usize;

    for entry in entries {
        let entry = entry.map_err(Error::Io)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let matches = path
            .file_name()
            .map(|name| matcher.is_match(Path::new(name)))
            .unwrap_or(false);
        if !matches {
            continue;
        }

        // Office lock files share the extension of the workbook they guard.
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("~$"))
        {
            continue;
        }

        let modified = match modified_at(&path) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read modification time");
                continue;
            }
        };

        if !freshness.accepts(modified) {
            stale += 1;
            continue;
        }

        if latest.as_ref().is_none_or(|(best, _)| modified > *best) {
            latest = Some((modified, path));
        }
    }

    match &latest {
        Some((_, path)) => debug!(path = %path.display(), "selected input file"),
        None if stale > 0 => warn!(dir = %dir.display(), stale, "only stale files found"),
        None => debug!(dir = %dir.display(), pattern, "no matching files"),
    }

    Ok(latest.map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn test_missing_directory_is_none() {
        let dir = TempDir::new().unwrap();
        let result = find_latest_file(&dir.path().join("nope"), "*.xlsx", &Freshness::days(30)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_pattern_filters_names() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "notes.txt");
        let xlsx = touch(dir.path(), "export.xlsx");
        touch(dir.path(), "~$export.xlsx");

        let result = find_latest_file(dir.path(), "*.xlsx", &Freshness::days(30)).unwrap();
        assert_eq!(result, Some(xlsx));
    }

    #[test]
    fn test_stale_files_rejected() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "old.xlsx");

        let future = Freshness {
            max_age: Duration::days(30),
            now: Local::now() + Duration::days(31),
        };
        let result = find_latest_file(dir.path(), "*.xlsx", &future).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(find_latest_file(dir.path(), "[", &Freshness::days(1)).is_err());
    }
}
