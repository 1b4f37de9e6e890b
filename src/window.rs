//! Day windows and the early-stopping per-day message iterator.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use tracing::trace;

use crate::error::Result;
use crate::model::Message;
use crate::session::MessageStream;

/// Half-open `[lower, upper)` range covering one calendar day.
///
/// `upper` is `lower + 24h` (saturating); timestamps are compared naive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    lower: NaiveDateTime,
    upper: NaiveDateTime,
}

impl DayWindow {
    /// Window starting at local midnight of `day`.
    ///
    /// On the last representable day the upper bound saturates at
    /// `NaiveDateTime::MAX`.
    #[must_use]
    pub fn for_day(day: NaiveDate) -> Self {
        let lower = day.and_time(chrono::NaiveTime::MIN);
        Self {
            lower,
            upper: lower
                .checked_add_signed(TimeDelta::days(1))
                .unwrap_or(NaiveDateTime::MAX),
        }
    }

    #[must_use]
    pub const fn lower(&self) -> NaiveDateTime {
        self.lower
    }

    #[must_use]
    pub const fn upper(&self) -> NaiveDateTime {
        self.upper
    }

    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.lower.date()
    }

    /// True once `date` has reached the end of the window.
    #[must_use]
    pub fn is_past(&self, date: NaiveDateTime) -> bool {
        date >= self.upper
    }
}

/// Yields one day's messages from a stream positioned at the window start.
///
/// Stops pulling from the stream as soon as a message at or past the
/// upper bound shows up, so a day never reads more than one message of
/// the next day. The lower bound is left to the stream's offset.
pub struct DayWindowIter<S> {
    stream: S,
    window: DayWindow,
    exhausted: bool,
}

impl<S: MessageStream> DayWindowIter<S> {
    pub const fn new(stream: S, window: DayWindow) -> Self {
        Self {
            stream,
            window,
            exhausted: false,
        }
    }

    #[must_use]
    pub const fn window(&self) -> DayWindow {
        self.window
    }

    /// Next message inside the window.
    ///
    /// # Errors
    /// Propagates transport errors from the underlying stream.
    pub async fn next(&mut self) -> Result<Option<Message>> {
        if self.exhausted {
            return Ok(None);
        }
        match self.stream.next_message().await? {
            Some(message) if !self.window.is_past(message.date) => Ok(Some(message)),
            Some(message) => {
                trace!(id = message.id, date = %message.date, "Window closed");
                self.exhausted = true;
                Ok(None)
            }
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }
}
