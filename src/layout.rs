//! Output directory layout.
//!
//! ```text
//! <base>/download-group-<group>-<today>-s-<start>-e-<end>/
//!   <mm-yyyy>/
//!     <dd-mm-yyyy>/
//!       <dd-mm-yyyy> <caption>/
//! ```

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::date_parser::{format_day, format_month};
use crate::error::{GmdlError, Result};

/// Name of the top-level folder for one run.
#[must_use]
pub fn run_folder_name(group: &str, today: NaiveDate, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "download-group-{group}-{}-s-{}-e-{}",
        format_day(today),
        format_day(start),
        format_day(end)
    )
}

/// Resolved folders of one run.
#[derive(Debug, Clone)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    #[must_use]
    pub fn new(
        base_path: &Path,
        group: &str,
        today: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Self {
        Self {
            root: base_path.join(run_folder_name(group, today, start, end)),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn month_dir(&self, day: NaiveDate) -> PathBuf {
        self.root.join(format_month(day))
    }

    #[must_use]
    pub fn day_dir(&self, day: NaiveDate) -> PathBuf {
        self.month_dir(day).join(format_day(day))
    }

    /// Create the run folder.
    ///
    /// # Errors
    /// Returns a path error if the folder cannot be created.
    pub fn create_root(&self) -> Result<()> {
        ensure_dir(&self.root)?;
        debug!(path = %self.root.display(), "Run folder ready");
        Ok(())
    }

    /// Create the month and day folders for `day`, returning the day folder.
    ///
    /// # Errors
    /// Returns a path error if either folder cannot be created.
    pub fn prepare_day(&self, day: NaiveDate) -> Result<PathBuf> {
        let month = self.month_dir(day);
        if !month.exists() {
            ensure_dir(&month)?;
            debug!(path = %month.display(), "Month folder created");
        }
        let day_dir = month.join(format_day(day));
        ensure_dir(&day_dir)?;
        Ok(day_dir)
    }

    /// Remove a day folder that received nothing.
    ///
    /// Empty group folders inside it go first; the day folder itself is
    /// only removed once it is empty.
    ///
    /// # Errors
    /// Returns a path error if the folder cannot be read or removed.
    pub fn prune_day(&self, day: NaiveDate) -> Result<bool> {
        let day_dir = self.day_dir(day);
        if !day_dir.exists() {
            return Ok(false);
        }
        let entries =
            std::fs::read_dir(&day_dir).map_err(|e| GmdlError::path_error("read", &day_dir, e))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                remove_if_empty(&path)?;
            }
        }
        let removed = remove_if_empty(&day_dir)?;
        if removed {
            info!(path = %day_dir.display(), "No files downloaded, folder removed");
        } else {
            warn!(path = %day_dir.display(), "Day folder not empty, keeping it");
        }
        Ok(removed)
    }
}

/// Create `path` and its parents; succeeds if it already exists.
///
/// # Errors
/// Returns a path error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| GmdlError::path_error("create directory", path, e))
}

/// Remove `path` only when it has no entries.
///
/// # Errors
/// Returns a path error if the folder cannot be read or removed.
pub fn remove_if_empty(path: &Path) -> Result<bool> {
    let mut entries =
        std::fs::read_dir(path).map_err(|e| GmdlError::path_error("read", path, e))?;
    if entries.next().is_some() {
        return Ok(false);
    }
    std::fs::remove_dir(path).map_err(|e| GmdlError::path_error("remove directory", path, e))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn run_folder_name_matches_layout() {
        assert_eq!(
            run_folder_name("Family", ymd(2024, 2, 1), ymd(2024, 1, 5), ymd(2024, 1, 7)),
            "download-group-Family-01-02-2024-s-05-01-2024-e-07-01-2024"
        );
    }

    #[test]
    fn day_dir_nests_under_month() {
        let layout = RunLayout::new(
            Path::new("/base"),
            "g",
            ymd(2024, 2, 1),
            ymd(2024, 1, 5),
            ymd(2024, 1, 5),
        );
        assert_eq!(
            layout.day_dir(ymd(2024, 1, 5)),
            Path::new("/base/download-group-g-01-02-2024-s-05-01-2024-e-05-01-2024/01-2024/05-01-2024")
        );
    }

    #[test]
    fn prepare_and_prune_day() {
        let tmp = TempDir::new().unwrap();
        let day = ymd(2024, 1, 5);
        let layout = RunLayout::new(tmp.path(), "g", day, day, day);
        layout.create_root().unwrap();

        let day_dir = layout.prepare_day(day).unwrap();
        assert!(day_dir.is_dir());
        std::fs::create_dir(day_dir.join("05-01-2024 Empty group")).unwrap();

        assert!(layout.prune_day(day).unwrap());
        assert!(!day_dir.exists());
        assert!(layout.month_dir(day).is_dir());
    }

    #[test]
    fn prune_keeps_non_empty_day() {
        let tmp = TempDir::new().unwrap();
        let day = ymd(2024, 1, 5);
        let layout = RunLayout::new(tmp.path(), "g", day, day, day);
        let day_dir = layout.prepare_day(day).unwrap();
        std::fs::write(day_dir.join("a.jpg"), b"x").unwrap();

        assert!(!layout.prune_day(day).unwrap());
        assert!(day_dir.join("a.jpg").exists());
    }
}
