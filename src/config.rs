//! Settings file and environment for gmdl.
//!
//! Later layers override earlier ones: built-in defaults, then
//! `~/.config/gmdl/config.toml` (or the file given with `--config`), then
//! `GMDL_*` variables. Command-line flags are applied on top by the binary.
//!
//! ```toml
//! [paths]
//! base = "/media/photos"
//! export = "~/Downloads/Telegram Desktop/ChatExport_2024-02-01"
//! restrictions = "data/restrictions.json"
//! presets = "data/configs.json"
//!
//! [download]
//! include_video = false
//! include_animation = false
//! keep_restricted_media = false
//! restrictions_key = "restrictions"
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! file = "gmdl.log"
//!
//! [output]
//! colors = true
//! quiet = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{GmdlError, Result};
use crate::model::{DisqualifiedCaption, MediaPolicy};
use crate::restrictions::DEFAULT_RESTRICTIONS_KEY;

/// Main configuration structure for gmdl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input and output locations.
    pub paths: PathsConfig,
    /// Download behavior.
    pub download: DownloadConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Terminal output.
    pub output: OutputConfig,

    /// File the settings were read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,

    /// Problems met while loading, logged by [`Config::log_load`].
    #[serde(skip)]
    load_warnings: Vec<String>,
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Default folder the run folder is created in.
    /// Environment variable: `GMDL_BASE`
    pub base: Option<PathBuf>,

    /// Chat export directory used as the message source.
    /// Environment variable: `GMDL_EXPORT`
    pub export: Option<PathBuf>,

    /// Restriction list (JSON).
    /// Environment variable: `GMDL_RESTRICTIONS`
    pub restrictions: PathBuf,

    /// Run presets (JSON).
    /// Environment variable: `GMDL_PRESETS`
    pub presets: PathBuf,
}

/// Download behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Treat videos as downloadable media.
    pub include_video: bool,

    /// Treat GIF animations as downloadable media.
    pub include_animation: bool,

    /// Keep media whose caption is restricted instead of dropping it.
    pub keep_restricted_media: bool,

    /// Root element of the restriction file.
    pub restrictions_key: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when neither `RUST_LOG` nor `-v`/`-q` decide.
    pub level: Option<String>,

    /// Stderr layout: `compact`, `pretty` or `full`.
    pub format: Option<String>,

    /// Also write logs to this file.
    /// Environment variable: `GMDL_LOG_FILE`
    pub file: Option<PathBuf>,
}

/// Terminal output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Disabled by `NO_COLOR` or `GMDL_NO_COLOR`.
    pub colors: bool,

    /// Hide the header and progress bars, like `-q`.
    pub quiet: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base: None,
            export: None,
            restrictions: PathBuf::from("data/restrictions.json"),
            presets: PathBuf::from("data/configs.json"),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            include_video: false,
            include_animation: false,
            keep_restricted_media: false,
            restrictions_key: DEFAULT_RESTRICTIONS_KEY.to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            colors: true,
            quiet: false,
        }
    }
}

impl DownloadConfig {
    #[must_use]
    pub const fn media_policy(&self) -> MediaPolicy {
        MediaPolicy {
            include_video: self.include_video,
            include_animation: self.include_animation,
        }
    }

    #[must_use]
    pub const fn disqualified_caption(&self) -> DisqualifiedCaption {
        if self.keep_restricted_media {
            DisqualifiedCaption::KeepMedia
        } else {
            DisqualifiedCaption::DropMessage
        }
    }
}

impl Config {
    /// Defaults, then the file layer, then the environment.
    ///
    /// An explicit `path` replaces the user config file and must exist.
    ///
    /// # Errors
    /// Returns an error if an explicitly given file is missing or invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_layers(path, Self::user_config_path(), |key| std::env::var(key).ok())
    }

    fn load_layers(
        explicit: Option<&Path>,
        user_file: Option<PathBuf>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(GmdlError::ConfigError {
                        path: path.to_path_buf(),
                        reason: "file not found".to_string(),
                    });
                }
                config.merge(Self::parse_file(path)?);
                config.source = Some(path.to_path_buf());
            }
            None => {
                // A broken user file is skipped rather than failing the run.
                if let Some(path) = user_file.filter(|p| p.exists()) {
                    match Self::parse_file(&path) {
                        Ok(file) => {
                            config.merge(file);
                            config.source = Some(path);
                        }
                        Err(e) => {
                            config.load_warnings.push(format!("Ignoring user config: {e}"));
                        }
                    }
                }
            }
        }

        config.apply_env_overrides(lookup);
        Ok(config)
    }

    /// Log where the settings came from and what went wrong while reading
    /// them. Loading happens before logging is set up, so call this after.
    pub fn log_load(&self) {
        match &self.source {
            Some(path) => info!(path = %path.display(), "Read config file"),
            None => debug!("No config file, using defaults"),
        }
        for warning in &self.load_warnings {
            warn!("{warning}");
        }
        debug!(config = ?self, "Config resolved");
    }

    /// Parse a TOML configuration file.
    ///
    /// # Errors
    /// Returns `ConfigError` for unreadable or malformed files.
    pub fn parse_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GmdlError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = toml::from_str(&content).map_err(|e| GmdlError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// `<config dir>/gmdl/config.toml`, when the platform has a config dir.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gmdl").join("config.toml"))
    }

    /// Apply environment variable overrides through `lookup`.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base) = lookup("GMDL_BASE") {
            self.paths.base = Some(PathBuf::from(base));
        }
        if let Some(export) = lookup("GMDL_EXPORT") {
            self.paths.export = Some(PathBuf::from(export));
        }
        if let Some(restrictions) = lookup("GMDL_RESTRICTIONS") {
            self.paths.restrictions = PathBuf::from(restrictions);
        }
        if let Some(presets) = lookup("GMDL_PRESETS") {
            self.paths.presets = PathBuf::from(presets);
        }
        if let Some(file) = lookup("GMDL_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
        if lookup("GMDL_NO_COLOR").is_some() || lookup("NO_COLOR").is_some() {
            self.output.colors = false;
        }
        if lookup("GMDL_QUIET").is_some() {
            self.output.quiet = true;
        }
    }

    /// Layer `file` over `self`. Optional values only replace when set.
    fn merge(&mut self, file: Self) {
        let Self {
            paths,
            download,
            logging,
            output,
            ..
        } = file;

        self.paths.base = paths.base.or(self.paths.base.take());
        self.paths.export = paths.export.or(self.paths.export.take());
        self.paths.restrictions = paths.restrictions;
        self.paths.presets = paths.presets;
        self.download = download;
        self.logging.level = logging.level.or(self.logging.level.take());
        self.logging.format = logging.format.or(self.logging.format.take());
        self.logging.file = logging.file.or(self.logging.file.take());
        self.output = output;
    }

    /// Write this config to [`Config::user_config_path`] and return that path.
    ///
    /// # Errors
    /// `ConfigError` without a platform config dir, `PathError` when the
    /// directory or file cannot be written.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::user_config_path().ok_or_else(|| GmdlError::ConfigError {
            path: PathBuf::from("~/.config/gmdl/config.toml"),
            reason: "no config directory on this platform".to_string(),
        })?;
        let dir = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)
            .map_err(|e| GmdlError::path_error("create directory", dir, e))?;
        std::fs::write(&path, self.to_toml())
            .map_err(|e| GmdlError::path_error("write", &path, e))?;
        info!(path = %path.display(), "Wrote config file");
        Ok(path)
    }

    /// Render as TOML.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths.restrictions, PathBuf::from("data/restrictions.json"));
        assert_eq!(config.paths.presets, PathBuf::from("data/configs.json"));
        assert_eq!(config.download.restrictions_key, "restrictions");
        assert_eq!(config.download.media_policy(), MediaPolicy::photos_only());
        assert_eq!(
            config.download.disqualified_caption(),
            DisqualifiedCaption::DropMessage
        );
        assert!(config.output.colors);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.download.include_video = true;
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert!(parsed.download.include_video);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: Config = toml::from_str("[download]\ninclude_animation = true\n").unwrap();
        assert!(parsed.download.include_animation);
        assert!(!parsed.download.include_video);
        assert_eq!(parsed.paths.presets, PathBuf::from("data/configs.json"));
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let mut other = Config::default();
        other.download.keep_restricted_media = true;
        other.paths.base = Some(PathBuf::from("/custom/path"));

        base.merge(other);

        assert_eq!(
            base.download.disqualified_caption(),
            DisqualifiedCaption::KeepMedia
        );
        assert_eq!(base.paths.base, Some(PathBuf::from("/custom/path")));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GMDL_EXPORT", "/exports/chat"),
            ("GMDL_RESTRICTIONS", "/etc/gmdl/r.json"),
            ("NO_COLOR", "1"),
        ]);
        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.paths.export, Some(PathBuf::from("/exports/chat")));
        assert_eq!(config.paths.restrictions, PathBuf::from("/etc/gmdl/r.json"));
        assert!(!config.output.colors);
        assert!(!config.output.quiet);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gmdl.toml");
        std::fs::write(&path, "[paths]\nbase = \"/photos\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.paths.base, Some(PathBuf::from("/photos")));
    }

    #[test]
    fn test_broken_user_file_is_kept_as_warning() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("config.toml");
        std::fs::write(&user, "[paths\nbase = ").unwrap();

        let config = Config::load_layers(None, Some(user), |_| None).unwrap();
        assert_eq!(config.source, None);
        assert_eq!(config.load_warnings.len(), 1);
        assert!(config.load_warnings[0].starts_with("Ignoring user config"));
        assert_eq!(config.paths.presets, PathBuf::from("data/configs.json"));
    }

    #[test]
    fn test_user_file_recorded_as_source() {
        let dir = TempDir::new().unwrap();
        let user = dir.path().join("config.toml");
        std::fs::write(&user, "[download]\ninclude_video = true\n").unwrap();

        let config = Config::load_layers(None, Some(user.clone()), |_| None).unwrap();
        assert_eq!(config.source, Some(user));
        assert!(config.load_warnings.is_empty());
        assert!(config.download.include_video);
        assert!(!config.to_toml().contains("source"));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, GmdlError::ConfigError { .. }));
    }

    #[test]
    fn default_toml_has_every_section() {
        let content = Config::default().to_toml();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[download]"));
        assert!(content.contains("[output]"));
    }
}
