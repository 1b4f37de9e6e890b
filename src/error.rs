//! Error type for gmdl.
//!
//! Library code returns [`GmdlError`]; the binary wraps it in `anyhow` and
//! renders it with [`format_gmdl_error`], which adds the fix hint and any
//! close match found for a mistyped group or preset name.

use colored::Colorize;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a gmdl command.
///
/// A failed download of a single message is not here: it is logged and
/// counted as zero by the save step.
#[derive(Error, Debug)]
pub enum GmdlError {
    /// No chat matches the requested name or id.
    #[error("Group or channel '{name}' not found")]
    EntityNotFound {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Session is not connected")]
    NotConnected,

    /// The export directory has no `result.json`.
    #[error("No chat export found at '{path}'")]
    ExportNotFound { path: PathBuf },

    /// Reading messages or fetching media failed.
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    /// Ctrl-C during a run.
    #[error("Interrupted")]
    Interrupted,

    /// Grouped mode was requested but the restriction file is absent.
    #[error("No restrictions available at '{path}'; grouped mode cannot run without them")]
    RestrictionsMissing { path: PathBuf },

    #[error("No presets available at '{path}'")]
    PresetsMissing { path: PathBuf },

    #[error("Preset '{selector}' not found")]
    PresetNotFound {
        selector: String,
        suggestion: Option<String>,
    },

    /// A run parameter was set neither by the preset nor by a flag.
    #[error("Missing required parameter: {name}")]
    MissingParameter { name: &'static str },

    /// Malformed JSON in an export, restriction or preset file.
    #[error("Failed to parse '{file}': {reason}")]
    ParseError { file: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Filesystem failure on a known path.
    #[error("Failed to {operation} '{path}': {source}")]
    PathError {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unreadable or malformed TOML configuration.
    #[error("Invalid configuration in '{path}': {reason}")]
    ConfigError { path: PathBuf, reason: String },

    #[error("Invalid date '{value}': expected dd-mm-yyyy")]
    InvalidDate { value: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A lower-level error with a note on what was being attempted.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for gmdl operations.
pub type Result<T> = std::result::Result<T, GmdlError>;

impl GmdlError {
    pub fn entity_not_found(name: impl Into<String>, suggestion: Option<String>) -> Self {
        Self::EntityNotFound {
            name: name.into(),
            suggestion,
        }
    }

    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    pub fn parse_error(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Filesystem error on `path` while performing `operation`.
    pub fn path_error(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::PathError {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Errors the user can fix by changing input, flags or files.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EntityNotFound { .. }
                | Self::ExportNotFound { .. }
                | Self::RestrictionsMissing { .. }
                | Self::PresetsMissing { .. }
                | Self::PresetNotFound { .. }
                | Self::MissingParameter { .. }
                | Self::InvalidDate { .. }
                | Self::InvalidArgument { .. }
        )
    }

    /// Close match recorded when a name lookup failed.
    #[must_use]
    pub fn did_you_mean(&self) -> Option<&str> {
        match self {
            Self::EntityNotFound { suggestion, .. } | Self::PresetNotFound { suggestion, .. } => {
                suggestion.as_deref()
            }
            _ => None,
        }
    }

    /// How to fix this error, when there is a standard answer.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::EntityNotFound { .. } => {
                Some("Check the group name; it must match the chat title or numeric id exactly.")
            }
            Self::ExportNotFound { .. } => {
                Some("Point --export at a Telegram Desktop JSON export containing result.json.")
            }
            Self::RestrictionsMissing { .. } => Some(
                "Create the restrictions file or pass --restrictions, or use --mode general.",
            ),
            Self::PresetsMissing { .. } => {
                Some("Create data/configs.json or pass the run parameters as flags.")
            }
            Self::MissingParameter { .. } => {
                Some("Pass the parameter as a flag or add it to the selected preset.")
            }
            Self::InvalidDate { .. } => Some("Use the dd-mm-yyyy format, e.g. 05-01-2024."),
            Self::Interrupted => Some("Re-run the same command to download the range again."),
            _ => None,
        }
    }
}

/// Attach a description of the failed step to foreign errors.
pub trait ResultExt<T> {
    /// # Errors
    /// Returns the error wrapped in [`GmdlError::WithContext`].
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| GmdlError::with_context(context, e))
    }
}

/// Render a failure for the terminal: a red marker and bold title, an
/// optional explanation, then one line per hint.
#[must_use]
pub fn format_error(title: &str, explanation: &str, hints: &[&str]) -> String {
    let mut lines = vec![format!("{} {}", "✗".red().bold(), title.bold())];
    if !explanation.is_empty() {
        lines.push(String::new());
        lines.push(format!("   {explanation}"));
    }
    if !hints.is_empty() {
        lines.push(String::new());
        lines.extend(
            hints
                .iter()
                .map(|hint| format!("   {} {hint}", "Hint:".cyan())),
        );
    }
    lines.join("\n")
}

/// Hint for failures that no change of input will fix.
const UNEXPECTED_HINT: &str =
    "Re-run with -v for details; if it persists, report it with that output.";

/// Render a `GmdlError` for the terminal, including hints.
#[must_use]
pub fn format_gmdl_error(err: &GmdlError) -> String {
    let close = err.did_you_mean().map(format_did_you_mean);
    let fallback =
        (!err.is_recoverable() && err.suggestion().is_none()).then_some(UNEXPECTED_HINT);
    let hints: Vec<&str> = close
        .as_deref()
        .into_iter()
        .chain(err.suggestion())
        .chain(fallback)
        .collect();
    format_error(&err.to_string(), "", &hints)
}

/// Edit distance (insertions, deletions, substitutions) between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let target: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=target.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in target.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }

    row[target.len()]
}

/// Closest candidate to `input`, ignoring case.
///
/// Only candidates within `max_distance` edits (default 2) are considered,
/// and an exact match is not a suggestion.
#[must_use]
pub fn find_closest_match<'a>(
    input: &str,
    candidates: &[&'a str],
    max_distance: Option<usize>,
) -> Option<&'a str> {
    let limit = max_distance.unwrap_or(2);
    let wanted = input.to_lowercase();

    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = levenshtein_distance(&wanted, &candidate.to_lowercase());
            (1..=limit).contains(&distance).then_some((distance, candidate))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate)
}

/// Format a "did you mean?" suggestion.
#[must_use]
pub fn format_did_you_mean(suggestion: &str) -> String {
    format!("Did you mean '{}'?", suggestion.green())
}
