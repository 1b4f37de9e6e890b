//! Download run orchestration.
//!
//! A run resolves the group once, creates its folder tree and scans the
//! requested days one after another. Days that end up with no files are
//! pruned. The session is always disconnected when the run ends, whether
//! it finished, failed or was interrupted with Ctrl-C.

use chrono::{Local, NaiveDate};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::date_parser::{DayRange, format_day, validate_range};
use crate::error::{GmdlError, Result};
use crate::layout::RunLayout;
use crate::log_progress;
use crate::logging::OperationGuard;
use crate::model::{DisqualifiedCaption, DownloadMode, MediaPolicy};
use crate::presets::RunParameters;
use crate::restrictions::{DEFAULT_RESTRICTIONS_KEY, RestrictionSet};
use crate::scan::{ScanOptions, scan_grouped_day, scan_ungrouped_day};
use crate::session::Session;
use crate::window::DayWindow;

/// What to download and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub group: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub base_path: PathBuf,
    pub mode: DownloadMode,
}

impl DownloadRequest {
    #[must_use]
    pub fn new(params: RunParameters, mode: DownloadMode) -> Self {
        Self {
            group: params.group,
            start: params.start,
            end: params.end,
            base_path: params.save_path,
            mode,
        }
    }
}

/// How a run behaves, independent of what it downloads.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub policy: MediaPolicy,
    pub on_disqualified: DisqualifiedCaption,
    pub restrictions_path: PathBuf,
    pub restrictions_key: String,
    /// Date stamped into the run folder name.
    pub today: NaiveDate,
    pub show_progress: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            policy: MediaPolicy::photos_only(),
            on_disqualified: DisqualifiedCaption::default(),
            restrictions_path: PathBuf::from("data/restrictions.json"),
            restrictions_key: DEFAULT_RESTRICTIONS_KEY.to_string(),
            today: Local::now().date_naive(),
            show_progress: false,
        }
    }
}

impl RunSettings {
    /// Settings taken from the effective configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            policy: config.download.media_policy(),
            on_disqualified: config.download.disqualified_caption(),
            restrictions_path: config.paths.restrictions.clone(),
            restrictions_key: config.download.restrictions_key.clone(),
            show_progress: !config.output.quiet,
            ..Self::default()
        }
    }
}

/// Result of one scanned day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub day: NaiveDate,
    pub count: usize,
    /// The day folder was removed because nothing was saved.
    pub pruned: bool,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_dir: PathBuf,
    pub days: Vec<DaySummary>,
    pub total: usize,
}

fn progress_bar(days: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(days as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    pb
}

fn load_restrictions(request: &DownloadRequest, settings: &RunSettings) -> Result<RestrictionSet> {
    match RestrictionSet::load(&settings.restrictions_path, &settings.restrictions_key)? {
        Some(set) => Ok(set),
        None if request.mode.needs_restrictions() => Err(GmdlError::RestrictionsMissing {
            path: settings.restrictions_path.clone(),
        }),
        None => Ok(RestrictionSet::empty()),
    }
}

/// Run a download over an already connected session.
///
/// # Errors
/// Fails on an inverted date range, missing restrictions in grouped mode,
/// an unknown group, folder creation failures and transport errors while
/// reading messages. Individual download failures are not errors.
pub async fn run_download<S: Session>(
    session: &S,
    request: &DownloadRequest,
    settings: &RunSettings,
) -> Result<RunSummary> {
    validate_range(request.start, request.end)?;
    let restrictions = load_restrictions(request, settings)?;
    let entity = session.resolve_entity(&request.group).await?;

    let layout = RunLayout::new(
        &request.base_path,
        &request.group,
        settings.today,
        request.start,
        request.end,
    );
    layout.create_root()?;
    info!(
        group = %entity.title,
        mode = %request.mode,
        folder = %layout.root().display(),
        "Download started"
    );

    let range = DayRange::new(request.start, request.end);
    let total_days = range.len_days();
    let pb = progress_bar(total_days, settings.show_progress);
    let options = ScanOptions {
        policy: settings.policy,
        on_disqualified: settings.on_disqualified,
        restrictions: &restrictions,
    };

    let mut days = Vec::with_capacity(total_days);
    let mut total = 0;
    for (done, day) in range.enumerate() {
        let label = format_day(day);
        pb.set_message(label.clone());

        let day_dir = layout.prepare_day(day)?;
        let window = DayWindow::for_day(day);
        let count = match request.mode {
            DownloadMode::Ungrouped => {
                scan_ungrouped_day(session, &entity, window, &day_dir, settings.policy).await?
            }
            DownloadMode::Grouped => {
                scan_grouped_day(session, &entity, window, &day_dir, &label, options).await?
            }
        };

        total += count;
        let pruned = count == 0 && layout.prune_day(day)?;
        info!(day = %label, count, "Day finished");
        days.push(DaySummary { day, count, pruned });

        pb.inc(1);
        log_progress!(done + 1, total_days, "Days processed");
    }
    pb.finish_and_clear();

    Ok(RunSummary {
        run_dir: layout.root().to_path_buf(),
        days,
        total,
    })
}

/// Connect, run, and disconnect on every exit path.
///
/// Ctrl-C cancels the run in flight and yields [`GmdlError::Interrupted`].
///
/// # Errors
/// Returns the connection error, or the error of the run itself.
pub async fn run_with_session<S: Session>(
    session: &mut S,
    request: &DownloadRequest,
    settings: &RunSettings,
) -> Result<RunSummary> {
    session.connect().await?;
    let guard = OperationGuard::new(format!("download {}", request.group));

    let outcome = tokio::select! {
        result = run_download(&*session, request, settings) => result,
        _ = tokio::signal::ctrl_c() => Err(GmdlError::Interrupted),
    };

    if let Err(e) = session.disconnect().await {
        warn!(error = %e, "Disconnect failed");
    }

    match &outcome {
        Ok(_) => guard.complete(),
        Err(e) => guard.fail(e),
    }
    outcome
}

/// Does `path` hold anything besides empty folders?
#[must_use]
pub fn has_files(path: &Path) -> bool {
    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .any(|entry| entry.file_type().is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemorySession, at, day, photo, text};
    use tempfile::TempDir;

    fn request(base: &Path, mode: DownloadMode, start: u32, end: u32) -> DownloadRequest {
        DownloadRequest {
            group: "Family".to_string(),
            start: day(start),
            end: day(end),
            base_path: base.to_path_buf(),
            mode,
        }
    }

    fn settings(restrictions: &Path) -> RunSettings {
        RunSettings {
            restrictions_path: restrictions.to_path_buf(),
            today: day(20),
            ..RunSettings::default()
        }
    }

    fn write_restrictions(dir: &Path, patterns: &[&str]) -> PathBuf {
        let path = dir.join("restrictions.json");
        let body = serde_json::json!({ "restrictions": patterns });
        std::fs::write(&path, body.to_string()).unwrap();
        path
    }

    const RUN_DIR: &str = "download-group-Family-20-01-2024-s-05-01-2024-e-05-01-2024";

    #[test]
    fn default_settings_download_photos_only() {
        let settings = RunSettings::default();
        assert_eq!(settings.policy, MediaPolicy::photos_only());
        assert_eq!(settings.on_disqualified, DisqualifiedCaption::DropMessage);
        assert!(!settings.show_progress);
    }

    #[tokio::test]
    async fn grouped_run_writes_theme_folder() {
        let tmp = TempDir::new().unwrap();
        let restrictions = write_restrictions(tmp.path(), &["spam"]);
        let base = tmp.path().join("out");
        let session = MemorySession::new(vec![
            photo(1, at(5, 18, 0), None),
            photo(2, at(5, 18, 1), None),
            text(3, at(5, 18, 2), "Sunset Walk"),
        ]);

        let summary = run_download(
            &session,
            &request(&base, DownloadMode::Grouped, 5, 5),
            &settings(&restrictions),
        )
        .await
        .unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.run_dir, base.join(RUN_DIR));
        let group_dir = summary
            .run_dir
            .join("01-2024/05-01-2024/05-01-2024 Sunset Walk");
        assert!(group_dir.join("1.bin").exists());
        assert!(group_dir.join("2.bin").exists());
    }

    #[tokio::test]
    async fn grouped_spam_only_day_is_pruned() {
        let tmp = TempDir::new().unwrap();
        let restrictions = write_restrictions(tmp.path(), &["spam"]);
        let base = tmp.path().join("out");
        let session = MemorySession::new(vec![photo(1, at(5, 9, 0), Some("spam offer"))]);

        let summary = run_download(
            &session,
            &request(&base, DownloadMode::Grouped, 5, 5),
            &settings(&restrictions),
        )
        .await
        .unwrap();

        assert_eq!(summary.total, 0);
        assert!(summary.days[0].pruned);
        assert!(!summary.run_dir.join("01-2024/05-01-2024").exists());
        assert!(summary.run_dir.join("01-2024").exists());
    }

    #[tokio::test]
    async fn unwritable_group_folder_does_not_end_run() {
        let tmp = TempDir::new().unwrap();
        let restrictions = write_restrictions(tmp.path(), &["spam"]);
        let base = tmp.path().join("out");
        let long_caption = "a".repeat(300);
        let session = MemorySession::new(vec![
            photo(1, at(5, 9, 0), None),
            text(2, at(5, 9, 1), &long_caption),
            photo(3, at(7, 9, 0), Some("Park")),
        ]);

        let summary = run_download(
            &session,
            &request(&base, DownloadMode::Grouped, 5, 7),
            &settings(&restrictions),
        )
        .await
        .unwrap();

        let counts: Vec<usize> = summary.days.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![0, 0, 1]);
        assert_eq!(session.downloaded_ids(), vec![3]);
        assert!(summary.days[0].pruned);
        assert!(!summary.run_dir.join("01-2024/05-01-2024").exists());
        assert!(
            summary
                .run_dir
                .join("01-2024/07-01-2024/07-01-2024 Park/3.bin")
                .exists()
        );
    }

    #[tokio::test]
    async fn ungrouped_run_counts_photos() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("out");
        let session = MemorySession::new(vec![
            photo(1, at(5, 8, 0), None),
            photo(2, at(5, 9, 0), Some("beach")),
            text(3, at(5, 10, 0), "lunch?"),
            photo(4, at(5, 11, 0), None),
        ]);

        let summary = run_download(
            &session,
            &request(&base, DownloadMode::Ungrouped, 5, 5),
            &settings(&tmp.path().join("missing.json")),
        )
        .await
        .unwrap();

        assert_eq!(summary.total, 3);
        let day_dir = summary.run_dir.join("01-2024/05-01-2024");
        let entries: Vec<_> = std::fs::read_dir(&day_dir).unwrap().flatten().collect();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.path().is_file()));
    }

    #[tokio::test]
    async fn grouped_without_restrictions_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("out");
        let session = MemorySession::new(vec![photo(1, at(5, 8, 0), None)]);

        let err = run_download(
            &session,
            &request(&base, DownloadMode::Grouped, 5, 5),
            &settings(&tmp.path().join("missing.json")),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GmdlError::RestrictionsMissing { .. }));
        assert!(!base.exists());
        assert!(session.downloaded_ids().is_empty());
    }

    #[tokio::test]
    async fn multi_day_run_prunes_empty_days() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("out");
        let session = MemorySession::new(vec![
            photo(1, at(5, 8, 0), None),
            photo(2, at(7, 8, 0), None),
        ]);

        let summary = run_download(
            &session,
            &request(&base, DownloadMode::Ungrouped, 5, 7),
            &settings(&tmp.path().join("missing.json")),
        )
        .await
        .unwrap();

        let counts: Vec<usize> = summary.days.iter().map(|d| d.count).collect();
        assert_eq!(counts, vec![1, 0, 1]);
        assert_eq!(summary.total, 2);
        assert!(summary.run_dir.join("01-2024/05-01-2024").exists());
        assert!(!summary.run_dir.join("01-2024/06-01-2024").exists());
        assert!(summary.run_dir.join("01-2024/07-01-2024").exists());
        assert!(has_files(&summary.run_dir));
    }

    #[tokio::test]
    async fn inverted_range_is_rejected_before_any_folder() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("out");
        let session = MemorySession::new(Vec::new());

        let err = run_download(
            &session,
            &request(&base, DownloadMode::Ungrouped, 7, 5),
            &settings(&tmp.path().join("missing.json")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GmdlError::InvalidArgument { .. }));
        assert!(!base.exists());
    }

    #[tokio::test]
    async fn unknown_group_still_disconnects() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("out");
        let mut session = MemorySession::new(Vec::new());
        let mut req = request(&base, DownloadMode::Ungrouped, 5, 5);
        req.group = "Strangers".to_string();

        let err = run_with_session(
            &mut session,
            &req,
            &settings(&tmp.path().join("missing.json")),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GmdlError::EntityNotFound { .. }));
        assert!(!session.connected);
        assert_eq!(session.disconnects, 1);
        assert!(!base.exists());
    }

    #[tokio::test]
    async fn successful_run_disconnects() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("out");
        let mut session = MemorySession::new(vec![photo(1, at(5, 8, 0), None)]);

        let summary = run_with_session(
            &mut session,
            &request(&base, DownloadMode::Ungrouped, 5, 5),
            &settings(&tmp.path().join("missing.json")),
        )
        .await
        .unwrap();

        assert_eq!(summary.total, 1);
        assert_eq!(session.disconnects, 1);
    }
}
