//! Saved run presets.
//!
//! A presets file lists named parameter sets so a recurring download can
//! be started without retyping the group, dates and destination:
//!
//! ```json
//! {"configs": [
//!   {"description": "Family, January",
//!    "config": {"groupName": "Family", "startDate": "01-01-2024",
//!               "endDate": "31-01-2024", "savePath": "/photos"}}
//! ]}
//! ```
//!
//! Any field may be left out; the CLI flags fill the gaps.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::date_parser::{parse_day, validate_range};
use crate::error::{GmdlError, Result, find_closest_match};

/// Root key of the presets file.
pub const PRESETS_KEY: &str = "configs";

/// Parameters a preset or the command line may supply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetFields {
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub save_path: Option<PathBuf>,
}

impl PresetFields {
    /// Fill every field missing here from `fallback`.
    #[must_use]
    pub fn or(self, fallback: &Self) -> Self {
        fn pick<T: Clone>(own: Option<T>, other: Option<&T>, blank: impl Fn(&T) -> bool) -> Option<T> {
            own.filter(|v| !blank(v))
                .or_else(|| other.filter(|v| !blank(*v)).cloned())
        }
        Self {
            group_name: pick(self.group_name, fallback.group_name.as_ref(), |s| s.trim().is_empty()),
            start_date: pick(self.start_date, fallback.start_date.as_ref(), |s| s.trim().is_empty()),
            end_date: pick(self.end_date, fallback.end_date.as_ref(), |s| s.trim().is_empty()),
            save_path: pick(self.save_path, fallback.save_path.as_ref(), |p| {
                p.as_os_str().is_empty()
            }),
        }
    }
}

/// A named entry of the presets file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub description: String,
    #[serde(default)]
    pub config: PresetFields,
}

#[derive(Debug, Deserialize)]
struct PresetsFile {
    #[serde(default, rename = "configs")]
    configs: Option<Vec<Preset>>,
}

/// All presets of one file, in file order.
#[derive(Debug, Clone, Default)]
pub struct PresetList {
    presets: Vec<Preset>,
}

impl PresetList {
    /// Parse the contents of a presets file.
    ///
    /// # Errors
    /// Returns `ParseError` for malformed JSON and `PresetsMissing` when the
    /// `configs` key is absent or empty.
    pub fn from_json(content: &str, path: &Path) -> Result<Self> {
        let file: PresetsFile = serde_json::from_str(content)
            .map_err(|e| GmdlError::parse_error(path.display().to_string(), e.to_string()))?;
        match file.configs {
            Some(presets) if !presets.is_empty() => Ok(Self { presets }),
            _ => Err(GmdlError::PresetsMissing {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Read the presets file at `path`.
    ///
    /// # Errors
    /// Returns `PresetsMissing` if the file does not exist, otherwise the
    /// errors of [`PresetList::from_json`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GmdlError::PresetsMissing {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| GmdlError::path_error("read", path, e))?;
        let list = Self::from_json(&content, path)?;
        debug!(path = %path.display(), count = list.presets.len(), "Loaded presets");
        Ok(list)
    }

    #[must_use]
    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    /// Pick a preset by 1-based position or by description.
    ///
    /// # Errors
    /// Returns `PresetNotFound`, with the closest description when one is
    /// near enough.
    pub fn select(&self, selector: &str) -> Result<&Preset> {
        let wanted = selector.trim();
        if let Ok(index) = wanted.parse::<usize>() {
            if let Some(preset) = index.checked_sub(1).and_then(|i| self.presets.get(i)) {
                return Ok(preset);
            }
        }
        if let Some(preset) = self
            .presets
            .iter()
            .find(|p| p.description.eq_ignore_ascii_case(wanted))
        {
            return Ok(preset);
        }

        let descriptions: Vec<&str> = self.presets.iter().map(|p| p.description.as_str()).collect();
        Err(GmdlError::PresetNotFound {
            selector: wanted.to_string(),
            suggestion: find_closest_match(wanted, &descriptions, None).map(String::from),
        })
    }
}

/// Fully resolved parameters of one download run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParameters {
    pub group: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub save_path: PathBuf,
}

impl RunParameters {
    /// Build run parameters from preset fields, falling back to `flags`.
    ///
    /// # Errors
    /// Returns `MissingParameter` if a field is set nowhere, `InvalidDate`
    /// for unparseable dates and `InvalidArgument` if the end date precedes
    /// the start date.
    pub fn resolve(preset: Option<&PresetFields>, flags: &PresetFields) -> Result<Self> {
        let fields = preset.cloned().unwrap_or_default().or(flags);

        let group = fields
            .group_name
            .ok_or(GmdlError::MissingParameter { name: "group" })?;
        let start = parse_day(
            &fields
                .start_date
                .ok_or(GmdlError::MissingParameter { name: "start" })?,
        )?;
        let end = parse_day(
            &fields
                .end_date
                .ok_or(GmdlError::MissingParameter { name: "end" })?,
        )?;
        let save_path = fields
            .save_path
            .ok_or(GmdlError::MissingParameter { name: "save-path" })?;

        validate_range(start, end)?;
        Ok(Self {
            group: group.trim().to_string(),
            start,
            end,
            save_path,
        })
    }
}
