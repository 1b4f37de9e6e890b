//! Logging setup for gmdl.
//!
//! Diagnostics go through `tracing`. Stderr gets a filtered, human-facing
//! stream; an optional log file gets every `gmdl` debug event without
//! colors, which is where per-message grouping decisions end up.
//!
//! ```rust
//! use gmdl::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::for_cli(false, true)).ok();
//! tracing::debug!("visible with -v");
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{GmdlError, Result};

/// How stderr log lines are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, for `-v`.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// One line with thread, file and line.
    Full,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Stderr threshold for `gmdl` events. `RUST_LOG` replaces it.
    pub level: LevelFilter,
    pub format: LogFormat,
    pub timestamps: bool,
    /// Show the module path of each event.
    pub target: bool,
    pub colors: bool,
    /// Append a plain copy of all debug events here.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
            format: LogFormat::Compact,
            timestamps: false,
            target: false,
            colors: true,
            file: None,
        }
    }
}

impl LogConfig {
    /// Preset for the global `-q` / `-v` flags; `quiet` wins.
    #[must_use]
    pub fn for_cli(quiet: bool, verbose: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self {
                level: LevelFilter::ERROR,
                ..Self::default()
            },
            (false, true) => Self {
                level: LevelFilter::DEBUG,
                format: LogFormat::Pretty,
                timestamps: true,
                target: true,
                ..Self::default()
            },
            (false, false) => Self::default(),
        }
    }

    /// Parse a level name such as `info` or `off`.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for unknown names.
    pub fn parse_level(name: &str) -> Result<LevelFilter> {
        name.trim()
            .parse::<LevelFilter>()
            .map_err(|_| GmdlError::invalid_argument(format!("unknown log level '{name}'")))
    }

    fn stderr_filter(&self) -> EnvFilter {
        match std::env::var("RUST_LOG") {
            Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
            _ => EnvFilter::new(format!("gmdl={}", self.level)),
        }
    }

    fn stderr_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync>
    where
        S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(self.colors)
            .with_target(self.target);

        match (self.format, self.timestamps) {
            (LogFormat::Full, _) => layer
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed(),
            (LogFormat::Pretty, true) => layer.pretty().boxed(),
            (LogFormat::Pretty, false) => layer.pretty().without_time().boxed(),
            (LogFormat::Compact, true) => layer.compact().boxed(),
            (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
        }
    }
}

/// Install the global subscriber. Later calls keep the first subscriber.
///
/// # Errors
/// Returns a path error if the log file cannot be opened.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let file_layer = config
        .file
        .as_ref()
        .map(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| GmdlError::path_error("open log file", path, e))
        })
        .transpose()?
        .map(|file| {
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new("gmdl=debug"))
        });

    let _ = tracing_subscriber::registry()
        .with(config.stderr_layer().with_filter(config.stderr_filter()))
        .with(file_layer)
        .try_init();
    Ok(())
}

/// Silent subscriber for tests.
pub fn init_test_logging() {
    let config = LogConfig {
        level: LevelFilter::OFF,
        ..LogConfig::default()
    };
    let _ = init_logging(&config);
}

/// Logs when a long operation starts and how it ended.
pub struct OperationGuard {
    name: String,
    started: Instant,
}

impl OperationGuard {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        tracing::info!(operation = %name, "Started");
        Self {
            name,
            started: Instant::now(),
        }
    }

    pub fn complete(self) {
        tracing::info!(
            operation = %self.name,
            elapsed_ms = self.started.elapsed().as_millis(),
            "Finished"
        );
    }

    pub fn fail(self, error: &dyn std::error::Error) {
        tracing::error!(
            operation = %self.name,
            elapsed_ms = self.started.elapsed().as_millis(),
            error = %error,
            "Failed"
        );
    }
}

/// Emit an `info` event carrying `done`, `total` and a whole percentage.
#[macro_export]
macro_rules! log_progress {
    ($done:expr, $total:expr, $($arg:tt)*) => {{
        let (done, total): (usize, usize) = ($done, $total);
        tracing::info!(
            done,
            total,
            percent = $crate::logging::percent(done, total),
            $($arg)*
        );
    }};
}

/// Whole-number percentage of `done` out of `total` (100 for an empty total).
#[must_use]
pub fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    u32::try_from(done.min(total) * 100 / total).unwrap_or(100)
}
