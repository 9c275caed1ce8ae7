//! Time window value object.
//!
//! # Responsibility
//! - Represent a half-open `[start, end)` range of absolute instants.
//! - Convert zoned inputs to UTC before any comparison happens.
//!
//! # Invariants
//! - `start <= end`. Zero-length windows are representable so raw busy
//!   lists can be ingested, but the interval algebra never emits them.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Construction error for time windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// End instant is earlier than the start instant.
    Reversed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Start and end coincide where a non-empty window is required.
    Empty { at: DateTime<Utc> },
    /// Text is not an RFC 3339 instant.
    InvalidInstant {
        value: String,
        source: chrono::ParseError,
    },
}

impl Display for WindowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reversed { start, end } => write!(
                f,
                "time window end `{}` is before start `{}`",
                end.to_rfc3339(),
                start.to_rfc3339()
            ),
            Self::Empty { at } => write!(f, "time window at `{}` is empty", at.to_rfc3339()),
            Self::InvalidInstant { value, source } => {
                write!(f, "invalid RFC 3339 instant `{value}`: {source}")
            }
        }
    }
}

impl Error for WindowError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInstant { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Half-open range of absolute instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Unchecked wire shape; only reachable through `TryFrom`.
#[derive(Deserialize)]
struct RawWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = WindowError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl TimeWindow {
    /// Creates a window from zoned instants, normalized to UTC.
    ///
    /// # Errors
    /// - Returns `WindowError::Reversed` when `end < start`.
    pub fn new<Tz1: TimeZone, Tz2: TimeZone>(
        start: DateTime<Tz1>,
        end: DateTime<Tz2>,
    ) -> Result<Self, WindowError> {
        let start = start.with_timezone(&Utc);
        let end = end.with_timezone(&Utc);
        if end < start {
            return Err(WindowError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses an RFC 3339 pair, e.g. a free/busy payload entry.
    pub fn parse_rfc3339(start: &str, end: &str) -> Result<Self, WindowError> {
        Self::new(parse_instant(start)?, parse_instant(end)?)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns `true` for zero-length windows.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// Returns whether both windows share at least one instant.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Restricts this window to `bounds`, or `None` when nothing remains.
    pub fn clip_to(&self, bounds: &TimeWindow) -> Option<TimeWindow> {
        let start = self.start.max(bounds.start);
        let end = self.end.min(bounds.end);
        if start < end {
            Some(TimeWindow { start, end })
        } else {
            None
        }
    }

    // Callers must guarantee `start <= end`.
    pub(crate) fn from_ordered(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }
}

fn parse_instant(value: &str) -> Result<DateTime<chrono::FixedOffset>, WindowError> {
    DateTime::parse_from_rfc3339(value.trim()).map_err(|source| WindowError::InvalidInstant {
        value: value.trim().to_string(),
        source,
    })
}
