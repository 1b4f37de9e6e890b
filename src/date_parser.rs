//! Date parsing and formatting for run parameters and folder names.
//!
//! Input dates use the `dd-mm-yyyy` form, with ISO `yyyy-mm-dd` accepted
//! as a fallback. Folder names always use `dd-mm-yyyy` and `mm-yyyy`.

use chrono::{Days, NaiveDate};
use tracing::debug;

use crate::error::{GmdlError, Result};

/// Format used for day folders and all user-facing dates.
pub const DAY_FORMAT: &str = "%d-%m-%Y";

/// Format used for month folders.
pub const MONTH_FORMAT: &str = "%m-%Y";

const ISO_FORMAT: &str = "%Y-%m-%d";

/// Parse a calendar day from user input.
///
/// # Errors
/// Returns `InvalidDate` when neither `dd-mm-yyyy` nor `yyyy-mm-dd` match.
pub fn parse_day(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if let Ok(day) = NaiveDate::parse_from_str(trimmed, DAY_FORMAT) {
        return Ok(day);
    }
    if let Ok(day) = NaiveDate::parse_from_str(trimmed, ISO_FORMAT) {
        debug!(input = trimmed, "Parsed ISO date");
        return Ok(day);
    }
    Err(GmdlError::InvalidDate {
        value: trimmed.to_string(),
    })
}

/// `dd-mm-yyyy`
#[must_use]
pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// `mm-yyyy`
#[must_use]
pub fn format_month(day: NaiveDate) -> String {
    day.format(MONTH_FORMAT).to_string()
}

/// Ensure `end` is not before `start`.
///
/// # Errors
/// Returns `InvalidArgument` for an inverted range.
pub fn validate_range(start: NaiveDate, end: NaiveDate) -> Result<()> {
    if end < start {
        return Err(GmdlError::invalid_argument(format!(
            "End date {} must be after or equal to the start date {}",
            format_day(end),
            format_day(start)
        )));
    }
    Ok(())
}

/// Inclusive iterator over every calendar day in `[start, end]`.
#[derive(Debug, Clone)]
pub struct DayRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl DayRange {
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            next: Some(start),
            end,
        }
    }

    /// Number of days in the range (0 for an inverted range).
    #[must_use]
    pub fn len_days(&self) -> usize {
        self.next.map_or(0, |start| {
            usize::try_from((self.end - start).num_days() + 1).unwrap_or(0)
        })
    }
}

impl Iterator for DayRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.filter(|day| *day <= self.end)?;
        self.next = current.checked_add_days(Days::new(1));
        Some(current)
    }
}
