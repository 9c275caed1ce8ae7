//! Calendar event description, weekday table and recurrence rules.
//!
//! # Responsibility
//! - Hold a fully resolved, zone-correct event ready for the Event Store.
//! - Own the single weekday enumeration (index + RRULE code lookups).
//! - Render the calendar insert body with colon-separated UTC offsets.
//!
//! # Invariants
//! - `EventSpec.start < EventSpec.end`.
//! - With a recurrence, `start`/`end` denote the first occurrence and the
//!   rule's `until` lies after `start`.

use crate::model::window::{TimeWindow, WindowError};
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Day of week, ordered Monday-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "MO")]
    Monday,
    #[serde(rename = "TU")]
    Tuesday,
    #[serde(rename = "WE")]
    Wednesday,
    #[serde(rename = "TH")]
    Thursday,
    #[serde(rename = "FR")]
    Friday,
    #[serde(rename = "SA")]
    Saturday,
    #[serde(rename = "SU")]
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Days since Monday (`Monday = 0`, `Sunday = 6`).
    pub fn index(self) -> u32 {
        match self {
            Self::Monday => 0,
            Self::Tuesday => 1,
            Self::Wednesday => 2,
            Self::Thursday => 3,
            Self::Friday => 4,
            Self::Saturday => 5,
            Self::Sunday => 6,
        }
    }

    /// RFC 5545 `BYDAY` code.
    pub fn rrule_code(self) -> &'static str {
        match self {
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
            Self::Sunday => "SU",
        }
    }

    /// English display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
            Self::Saturday => "Saturday",
            Self::Sunday => "Sunday",
        }
    }

    /// Looks up a full English day name, case-insensitively.
    pub fn from_name(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|day| day.name().eq_ignore_ascii_case(trimmed))
    }

    pub fn from_chrono(value: chrono::Weekday) -> Self {
        Self::ALL[value.num_days_from_monday() as usize]
    }
}

/// Recurrence frequency. Only weekly rules are produced today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Weekly,
}

impl Frequency {
    fn as_rrule(self) -> &'static str {
        match self {
            Self::Weekly => "WEEKLY",
        }
    }
}

/// Weekly recurrence anchored on one weekday, ending on `until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub by_day: Weekday,
    /// Last calendar day (UTC) on which occurrences may start.
    pub until: NaiveDate,
}

impl RecurrenceRule {
    pub fn weekly(by_day: Weekday, until: NaiveDate) -> Self {
        Self {
            frequency: Frequency::Weekly,
            by_day,
            until,
        }
    }

    /// Last instant covered by the rule (`until` at 23:59:59 UTC).
    pub fn until_instant(&self) -> DateTime<Utc> {
        let end_of_day = self
            .until
            .and_hms_opt(23, 59, 59)
            .unwrap_or_else(|| self.until.and_time(chrono::NaiveTime::MIN));
        Utc.from_utc_datetime(&end_of_day)
    }

    /// Renders the rule as a calendar `RRULE` line.
    ///
    /// Example: `RRULE:FREQ=WEEKLY;BYDAY=MO;UNTIL=20251231T235959Z`.
    pub fn to_rrule(&self) -> String {
        format!(
            "RRULE:FREQ={};BYDAY={};UNTIL={}",
            self.frequency.as_rrule(),
            self.by_day.rrule_code(),
            self.until_instant().format("%Y%m%dT%H%M%SZ")
        )
    }
}

/// Fully resolved calendar event, ready for creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEventSpec")]
pub struct EventSpec {
    pub summary: String,
    pub description: String,
    /// Start instant carrying the zone offset in effect on its own date.
    start: DateTime<FixedOffset>,
    /// End instant carrying the zone offset in effect on its own date.
    end: DateTime<FixedOffset>,
    /// IANA zone name, kept for display and for the calendar body.
    pub time_zone: String,
    pub recurrence: Option<RecurrenceRule>,
}

#[derive(Deserialize)]
struct RawEventSpec {
    summary: String,
    description: String,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    time_zone: String,
    recurrence: Option<RecurrenceRule>,
}

impl TryFrom<RawEventSpec> for EventSpec {
    type Error = WindowError;

    fn try_from(raw: RawEventSpec) -> Result<Self, Self::Error> {
        let spec = Self::new(raw.summary, raw.description, raw.start, raw.end, raw.time_zone)?;
        Ok(match raw.recurrence {
            Some(rule) => spec.with_recurrence(rule),
            None => spec,
        })
    }
}

impl EventSpec {
    /// Creates a one-off event spec.
    ///
    /// # Errors
    /// - `WindowError::Reversed` when `end < start`.
    /// - `WindowError::Empty` when `end == start`.
    pub fn new(
        summary: impl Into<String>,
        description: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        time_zone: impl Into<String>,
    ) -> Result<Self, WindowError> {
        let window = TimeWindow::new(start, end)?;
        if window.is_empty() {
            return Err(WindowError::Empty {
                at: window.start(),
            });
        }
        Ok(Self {
            summary: summary.into(),
            description: description.into(),
            start,
            end,
            time_zone: time_zone.into(),
            recurrence: None,
        })
    }

    /// Attaches a recurrence rule; times become the first occurrence.
    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Absolute window of the (first) occurrence.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::from_ordered(self.start.with_timezone(&Utc), self.end.with_timezone(&Utc))
    }

    /// Start as RFC 3339 with a colon-separated offset, e.g.
    /// `2025-12-08T20:00:00-06:00`.
    pub fn start_rfc3339(&self) -> String {
        format_offset_rfc3339(&self.start)
    }

    pub fn end_rfc3339(&self) -> String {
        format_offset_rfc3339(&self.end)
    }

    /// Builds the calendar insert body for this event.
    pub fn to_event_body(&self) -> EventBody {
        EventBody {
            summary: self.summary.clone(),
            description: self.description.clone(),
            start: EventDateTime {
                date_time: self.start_rfc3339(),
                time_zone: self.time_zone.clone(),
            },
            end: EventDateTime {
                date_time: self.end_rfc3339(),
                time_zone: self.time_zone.clone(),
            },
            recurrence: self.recurrence.map(|rule| vec![rule.to_rrule()]),
        }
    }
}

/// Calendar insert payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
}

/// `{dateTime, timeZone}` pair of the calendar payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: String,
    pub time_zone: String,
}

fn format_offset_rfc3339(value: &DateTime<FixedOffset>) -> String {
    // use_z=false keeps `+00:00` instead of `Z` for UTC offsets.
    value.to_rfc3339_opts(SecondsFormat::Secs, false)
}
