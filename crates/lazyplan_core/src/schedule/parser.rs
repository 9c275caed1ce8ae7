//! Schedule line parser.
//!
//! # Responsibility
//! - Turn `"<Summary> on|Every <Day>: <Start> - <End> (<note>)"` lines into
//!   `EventSpec` values resolved in one IANA zone.
//! - Apply lines of a text block independently, collecting soft failures.
//!
//! # Invariants
//! - "now" is injected; the parser never reads the system clock.
//! - The next occurrence of the day is chosen, except that today is kept
//!   while today's start time has not elapsed yet.
//! - An end time earlier than the start time lands on the following day.
//! - Offsets are resolved per occurrence date, so DST is respected.

use crate::model::event::{EventSpec, RecurrenceRule, Weekday};
use crate::model::window::WindowError;
use chrono::{
    DateTime, Datelike, Days, FixedOffset, LocalResult, NaiveDate, NaiveTime, Offset, TimeZone,
};
use chrono_tz::Tz;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static SCHEDULE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<summary>.+?)\s+(?P<mode>on|every)\s+(?P<day>[a-z]+)\s*:\s*(?P<start>\d{1,2}:\d{2}\s*[ap]m)\s*[-\x{2013}]\s*(?P<end>\d{1,2}:\d{2}\s*[ap]m)\s*(?P<note>\(.*\))?$",
    )
    .expect("valid schedule line regex")
});
static CLOCK_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<meridiem>[ap]m)$")
        .expect("valid clock time regex")
});

/// Typed failure for one schedule line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Line does not follow the schedule grammar.
    Malformed(String),
    /// Day token is not an English weekday name.
    UnknownDay(String),
    /// Time token is not a valid 12-hour clock value.
    InvalidTime(String),
    /// Time zone name is not in the IANA database.
    UnknownTimeZone(String),
    /// Wall-clock time falls into a DST gap on the resolved date.
    NonexistentLocalTime {
        date: NaiveDate,
        time: NaiveTime,
        time_zone: String,
    },
    /// Resolved start/end do not form a non-empty window.
    InvalidWindow(WindowError),
    /// Configured recurrence horizon ends before the first occurrence.
    HorizonBeforeStart(NaiveDate),
    /// Date arithmetic left the supported calendar range.
    DateOutOfRange,
}

impl ParseError {
    /// Stable machine-readable code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_line",
            Self::UnknownDay(_) => "unknown_day",
            Self::InvalidTime(_) => "invalid_time",
            Self::UnknownTimeZone(_) => "unknown_time_zone",
            Self::NonexistentLocalTime { .. } => "nonexistent_local_time",
            Self::InvalidWindow(_) => "invalid_window",
            Self::HorizonBeforeStart(_) => "horizon_before_start",
            Self::DateOutOfRange => "date_out_of_range",
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(line) => write!(f, "schedule line not recognized: `{line}`"),
            Self::UnknownDay(day) => write!(f, "unrecognized day `{day}`"),
            Self::InvalidTime(value) => write!(f, "invalid 12-hour time `{value}`"),
            Self::UnknownTimeZone(name) => write!(f, "unknown time zone `{name}`"),
            Self::NonexistentLocalTime {
                date,
                time,
                time_zone,
            } => write!(f, "{date} {time} does not exist in {time_zone}"),
            Self::InvalidWindow(err) => write!(f, "{err}"),
            Self::HorizonBeforeStart(until) => {
                write!(f, "recurrence horizon {until} ends before the first occurrence")
            }
            Self::DateOutOfRange => write!(f, "resolved date is out of range"),
        }
    }
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidWindow(err) => Some(err),
            _ => None,
        }
    }
}

impl From<WindowError> for ParseError {
    fn from(value: WindowError) -> Self {
        Self::InvalidWindow(value)
    }
}

/// Connective word of a schedule line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// `on <Day>`: one occurrence.
    Once,
    /// `Every <Day>`: weekly series.
    Weekly,
}

/// One line that failed inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFailure {
    /// 1-based line number within the input block.
    pub line_number: usize,
    pub line: String,
    pub error: ParseError,
}

/// Batch result: parsed specs plus skipped lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchParse {
    pub events: Vec<EventSpec>,
    pub failures: Vec<LineFailure>,
}

/// Parser bound to one IANA zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleLineParser {
    tz: Tz,
    recurrence_until: Option<NaiveDate>,
}

impl ScheduleLineParser {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            recurrence_until: None,
        }
    }

    /// Creates a parser from an IANA zone name such as `America/Chicago`.
    pub fn from_zone_name(name: &str) -> Result<Self, ParseError> {
        let tz = name
            .trim()
            .parse::<Tz>()
            .map_err(|_| ParseError::UnknownTimeZone(name.trim().to_string()))?;
        Ok(Self::new(tz))
    }

    /// Fixes the `UNTIL` date of weekly rules.
    ///
    /// Without it the horizon is the end of the first occurrence's year.
    pub fn with_recurrence_until(mut self, until: NaiveDate) -> Self {
        self.recurrence_until = Some(until);
        self
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    /// Parses one schedule line relative to `now`.
    ///
    /// # Errors
    /// - `Malformed` when the line shape does not match.
    /// - `UnknownDay` / `InvalidTime` for bad tokens.
    /// - `NonexistentLocalTime` when a wall-clock time falls in a DST gap.
    pub fn parse_line<Z: TimeZone>(
        &self,
        line: &str,
        now: &DateTime<Z>,
    ) -> Result<EventSpec, ParseError> {
        let line = line.trim();
        let caps = SCHEDULE_LINE_RE
            .captures(line)
            .ok_or_else(|| ParseError::Malformed(line.to_string()))?;

        let summary = caps["summary"].trim().to_string();
        let mode = if caps["mode"].eq_ignore_ascii_case("every") {
            ScheduleMode::Weekly
        } else {
            ScheduleMode::Once
        };
        let day = Weekday::from_name(&caps["day"])
            .ok_or_else(|| ParseError::UnknownDay(caps["day"].to_string()))?;
        let start_time = parse_clock_time(&caps["start"])?;
        let end_time = parse_clock_time(&caps["end"])?;

        let date = self.resolve_date(day, start_time, now)?;
        let end_date = if end_time < start_time {
            date.checked_add_days(Days::new(1))
                .ok_or(ParseError::DateOutOfRange)?
        } else {
            date
        };

        let start = self.localize(date, start_time)?;
        let end = self.localize(end_date, end_time)?;
        let description = match mode {
            ScheduleMode::Once => format!("{summary} on {}", day.name()),
            ScheduleMode::Weekly => format!("{summary} every {}", day.name()),
        };
        let spec = EventSpec::new(summary, description, start, end, self.tz.name())?;

        match mode {
            ScheduleMode::Once => Ok(spec),
            ScheduleMode::Weekly => {
                let until = self.recurrence_horizon(&spec)?;
                Ok(spec.with_recurrence(RecurrenceRule::weekly(day, until)))
            }
        }
    }

    /// Parses every non-blank line of `text`; failing lines are skipped.
    pub fn parse_block<Z: TimeZone>(&self, text: &str, now: &DateTime<Z>) -> BatchParse {
        let mut batch = BatchParse::default();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            match self.parse_line(line, now) {
                Ok(spec) => batch.events.push(spec),
                Err(error) => {
                    warn!(
                        "event=schedule_line_skipped module=schedule status=skipped line_no={} error_code={}",
                        index + 1,
                        error.code()
                    );
                    batch.failures.push(LineFailure {
                        line_number: index + 1,
                        line: line.to_string(),
                        error,
                    });
                }
            }
        }
        debug!(
            "event=schedule_block_parsed module=schedule status=ok parsed={} skipped={}",
            batch.events.len(),
            batch.failures.len()
        );
        batch
    }

    fn resolve_date<Z: TimeZone>(
        &self,
        day: Weekday,
        start_time: NaiveTime,
        now: &DateTime<Z>,
    ) -> Result<NaiveDate, ParseError> {
        let local_now = now.with_timezone(&self.tz).naive_local();
        let today = local_now.date();
        let today_weekday = Weekday::from_chrono(today.weekday());
        let mut days_ahead = (day.index() + 7 - today_weekday.index()) % 7;
        if days_ahead == 0 && local_now > today.and_time(start_time) {
            days_ahead = 7;
        }
        today
            .checked_add_days(Days::new(u64::from(days_ahead)))
            .ok_or(ParseError::DateOutOfRange)
    }

    fn localize(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<DateTime<FixedOffset>, ParseError> {
        let resolved = match self.tz.from_local_datetime(&date.and_time(time)) {
            LocalResult::Single(value) => value,
            // Fall-back fold: the first of the two wall-clock readings.
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                return Err(ParseError::NonexistentLocalTime {
                    date,
                    time,
                    time_zone: self.tz.name().to_string(),
                });
            }
        };
        let offset = resolved.offset().fix();
        Ok(resolved.with_timezone(&offset))
    }

    fn recurrence_horizon(&self, spec: &EventSpec) -> Result<NaiveDate, ParseError> {
        let start_utc = spec.window().start();
        if let Some(until) = self.recurrence_until {
            let rule = RecurrenceRule::weekly(Weekday::Monday, until);
            if rule.until_instant() <= start_utc {
                return Err(ParseError::HorizonBeforeStart(until));
            }
            return Ok(until);
        }

        let mut year = spec.start().year();
        loop {
            let until = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(ParseError::DateOutOfRange)?;
            if RecurrenceRule::weekly(Weekday::Monday, until).until_instant() > start_utc {
                return Ok(until);
            }
            year += 1;
        }
    }
}

fn parse_clock_time(value: &str) -> Result<NaiveTime, ParseError> {
    let trimmed = value.trim();
    let invalid = || ParseError::InvalidTime(trimmed.to_string());
    let caps = CLOCK_TIME_RE.captures(trimmed).ok_or_else(invalid)?;

    let hour: u32 = caps["hour"].parse().map_err(|_| invalid())?;
    let minute: u32 = caps["minute"].parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&hour) {
        return Err(invalid());
    }
    let is_pm = caps["meridiem"].eq_ignore_ascii_case("pm");
    let hour24 = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    NaiveTime::from_hms_opt(hour24, minute, 0).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::{parse_clock_time, ParseError, ScheduleLineParser};
    use chrono::{NaiveTime, TimeZone};
    use chrono_tz::America::Chicago;

    #[test]
    fn clock_time_handles_noon_and_midnight() {
        assert_eq!(
            parse_clock_time("12:00 AM").unwrap(),
            NaiveTime::from_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_clock_time("12:30 pm").unwrap(),
            NaiveTime::from_hms_opt(12, 30, 0).unwrap()
        );
        assert_eq!(
            parse_clock_time("7:05PM").unwrap(),
            NaiveTime::from_hms_opt(19, 5, 0).unwrap()
        );
    }

    #[test]
    fn clock_time_rejects_out_of_range_values() {
        assert!(matches!(
            parse_clock_time("13:00 PM"),
            Err(ParseError::InvalidTime(_))
        ));
        assert!(matches!(
            parse_clock_time("0:15 AM"),
            Err(ParseError::InvalidTime(_))
        ));
        assert!(matches!(
            parse_clock_time("9:75 AM"),
            Err(ParseError::InvalidTime(_))
        ));
    }

    #[test]
    fn from_zone_name_rejects_unknown_zone() {
        let err = ScheduleLineParser::from_zone_name("Mars/Olympus").unwrap_err();
        assert_eq!(err, ParseError::UnknownTimeZone("Mars/Olympus".to_string()));
    }

    #[test]
    fn unknown_day_is_reported() {
        let parser = ScheduleLineParser::new(Chicago);
        let now = Chicago.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap();
        let err = parser
            .parse_line("Yoga on Caturday: 8:00 AM - 9:00 AM", &now)
            .unwrap_err();
        assert_eq!(err, ParseError::UnknownDay("Caturday".to_string()));
    }

    #[test]
    fn equal_start_and_end_is_rejected() {
        let parser = ScheduleLineParser::new(Chicago);
        let now = Chicago.with_ymd_and_hms(2025, 12, 1, 9, 0, 0).unwrap();
        let err = parser
            .parse_line("Ping on Tuesday: 8:00 AM - 8:00 AM", &now)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_window");
    }
}
