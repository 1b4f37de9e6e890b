//! Restriction set: substrings that disqualify a caption as a description.
//!
//! The restriction file is JSON keyed by a root element:
//!
//! ```json
//! {
//!   "restrictions": [
//!     { "notDescriptionMessage": ["http", "#ad", "Forwarded"] }
//!   ]
//! }
//! ```
//!
//! A flat list of strings under the root key is accepted too.

use aho_corasick::AhoCorasick;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{GmdlError, Result, ResultExt};

/// Root element looked up when none is configured.
pub const DEFAULT_RESTRICTIONS_KEY: &str = "restrictions";

/// Ordered exclusion substrings, matched literally and case-sensitively.
#[derive(Debug, Clone, Default)]
pub struct RestrictionSet {
    patterns: Vec<String>,
    matcher: Option<AhoCorasick>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RestrictionEntry {
    Pattern(String),
    Group {
        #[serde(rename = "notDescriptionMessage", default)]
        not_description_message: Vec<String>,
    },
}

impl RestrictionSet {
    /// Build a set from patterns. Empty patterns are skipped since they
    /// would match every caption.
    ///
    /// # Errors
    /// Returns an error if the matcher cannot be built.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(Into::into)
            .filter(|p| !p.is_empty())
            .collect();
        let matcher = if patterns.is_empty() {
            None
        } else {
            Some(AhoCorasick::new(&patterns).context("Failed to build restriction matcher")?)
        };
        Ok(Self { patterns, matcher })
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if `caption` contains any restriction substring.
    #[must_use]
    pub fn disqualifies(&self, caption: &str) -> bool {
        self.matcher
            .as_ref()
            .is_some_and(|matcher| matcher.is_match(caption))
    }

    /// A caption names a group when it is non-empty and hits no restriction.
    #[must_use]
    pub fn is_description(&self, caption: &str) -> bool {
        !caption.is_empty() && !self.disqualifies(caption)
    }

    /// Parse restriction JSON, reading the value under `root_key`.
    ///
    /// A missing root key yields an empty set.
    ///
    /// # Errors
    /// Returns a parse error for malformed JSON.
    pub fn from_json(content: &str, root_key: &str, file: &str) -> Result<Self> {
        let mut document: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| GmdlError::parse_error(file, e.to_string()))?;
        let Some(value) = document.get_mut(root_key).map(serde_json::Value::take) else {
            debug!(file, root_key, "Root element missing, using empty restriction set");
            return Ok(Self::empty());
        };
        let entries: Vec<RestrictionEntry> = serde_json::from_value(value)
            .map_err(|e| GmdlError::parse_error(file, e.to_string()))?;

        let patterns = entries.into_iter().flat_map(|entry| match entry {
            RestrictionEntry::Pattern(pattern) => vec![pattern],
            RestrictionEntry::Group {
                not_description_message,
            } => not_description_message,
        });
        Self::new(patterns)
    }

    /// Load the restriction file.
    ///
    /// Returns `Ok(None)` with a warning when the file does not exist;
    /// callers decide whether that is fatal.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(path: &Path, root_key: &str) -> Result<Option<Self>> {
        if !path.exists() {
            warn!(path = %path.display(), "Restriction file not found");
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| GmdlError::path_error("read", path, e))?;
        let set = Self::from_json(&content, root_key, &path.display().to_string())?;
        info!(
            path = %path.display(),
            count = set.patterns.len(),
            "Loaded restrictions"
        );
        Ok(Some(set))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn literal_case_sensitive_unanchored() {
        let set = RestrictionSet::new(["spam", "http"]).unwrap();
        assert!(set.disqualifies("spam offer"));
        assert!(set.disqualifies("see https://example.com"));
        assert!(set.disqualifies("antispam"));
        assert!(!set.disqualifies("SPAM offer"));
        assert!(!set.disqualifies("Sunset Walk"));
    }

    #[test]
    fn is_description_requires_text() {
        let set = RestrictionSet::new(["spam"]).unwrap();
        assert!(set.is_description("Sunset Walk"));
        assert!(!set.is_description(""));
        assert!(!set.is_description("spam"));
        assert!(RestrictionSet::empty().is_description("anything"));
    }

    #[test]
    fn empty_patterns_are_ignored() {
        let set = RestrictionSet::new(["", "ad"]).unwrap();
        assert_eq!(set.patterns(), ["ad".to_string()]);
        assert!(set.is_description("Beach"));
    }

    #[test]
    fn parses_grouped_format_in_order() {
        let json = r##"{
            "restrictions": [
                { "notDescriptionMessage": ["http", "#ad"] },
                { "notDescriptionMessage": ["Forwarded"] }
            ]
        }"##;
        let set = RestrictionSet::from_json(json, "restrictions", "test.json").unwrap();
        assert_eq!(set.patterns(), ["http", "#ad", "Forwarded"]);
    }

    #[test]
    fn parses_flat_list() {
        let json = r#"{ "restrictions": ["spam", "promo"] }"#;
        let set = RestrictionSet::from_json(json, "restrictions", "test.json").unwrap();
        assert_eq!(set.patterns(), ["spam", "promo"]);
    }

    #[test]
    fn missing_root_key_is_empty() {
        let set = RestrictionSet::from_json("{}", "restrictions", "test.json").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = RestrictionSet::from_json("{not json", "restrictions", "bad.json").unwrap_err();
        assert!(matches!(err, GmdlError::ParseError { .. }));
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded = RestrictionSet::load(&dir.path().join("nope.json"), "restrictions").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("restrictions.json");
        std::fs::write(&path, r#"{"restrictions":[{"notDescriptionMessage":["spam"]}]}"#).unwrap();
        let set = RestrictionSet::load(&path, "restrictions").unwrap().unwrap();
        assert!(set.disqualifies("spam offer"));
    }
}
