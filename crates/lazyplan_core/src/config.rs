//! Planner configuration.
//!
//! # Responsibility
//! - Deserialize planner settings from JSON with stable defaults.
//! - Validate settings before any store or parser is built from them.
//!
//! # Invariants
//! - A validated config always names a known IANA time zone.
//! - Identifiers are non-empty after trimming.

use crate::logging::{default_log_level, normalize_level};
use crate::model::window::TimeWindow;
use crate::schedule::availability::upcoming_range;
use crate::schedule::parser::ScheduleLineParser;
use chrono::{DateTime, NaiveDate, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_TIME_ZONE: &str = "America/Chicago";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_TASK_LIST_ID: &str = "@default";
pub const DEFAULT_FREE_BUSY_DAYS: u32 = 7;

/// Settings shared by the parser, resolver and synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// IANA zone schedule lines are interpreted in.
    pub time_zone: String,
    pub calendar_id: String,
    pub task_list_id: String,
    /// Lookahead for free-window queries, in days.
    pub free_busy_days: u32,
    /// Fixed `UNTIL` date for weekly rules.
    pub recurrence_until: Option<NaiveDate>,
    pub log_level: Option<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            time_zone: DEFAULT_TIME_ZONE.to_string(),
            calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            task_list_id: DEFAULT_TASK_LIST_ID.to_string(),
            free_busy_days: DEFAULT_FREE_BUSY_DAYS,
            recurrence_until: None,
            log_level: None,
        }
    }
}

impl PlannerConfig {
    /// Checks field-level invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zone()?;
        if self.calendar_id.trim().is_empty() {
            return Err(ConfigError::EmptyField("calendar_id"));
        }
        if self.task_list_id.trim().is_empty() {
            return Err(ConfigError::EmptyField("task_list_id"));
        }
        if self.free_busy_days == 0 {
            return Err(ConfigError::ZeroLookahead);
        }
        if let Some(level) = &self.log_level {
            normalize_level(level).map_err(ConfigError::InvalidLogLevel)?;
        }
        Ok(())
    }

    pub fn zone(&self) -> Result<Tz, ConfigError> {
        self.time_zone
            .trim()
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimeZone(self.time_zone.clone()))
    }

    /// Level for `init_logging`; falls back to the build-mode default.
    pub fn effective_log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .unwrap_or(default_log_level())
    }

    /// Free/busy query range starting at `now`.
    pub fn lookahead_range<Z: TimeZone>(&self, now: &DateTime<Z>) -> TimeWindow {
        upcoming_range(now, self.free_busy_days)
    }

    /// Builds the schedule parser these settings describe.
    pub fn schedule_parser(&self) -> Result<ScheduleLineParser, ConfigError> {
        let parser = ScheduleLineParser::new(self.zone()?);
        Ok(match self.recurrence_until {
            Some(until) => parser.with_recurrence_until(until),
            None => parser,
        })
    }
}

/// Config load and validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
    UnknownTimeZone(String),
    EmptyField(&'static str),
    ZeroLookahead,
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid config json: {err}"),
            Self::UnknownTimeZone(name) => write!(f, "unknown time zone `{name}`"),
            Self::EmptyField(field) => write!(f, "config field `{field}` cannot be empty"),
            Self::ZeroLookahead => write!(f, "free_busy_days must be at least 1"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Parses and validates a JSON config document.
pub fn parse_config(json: &str) -> Result<PlannerConfig, ConfigError> {
    let config: PlannerConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Reads, parses and validates the JSON config at `path`.
pub fn load_config(path: impl AsRef<Path>) -> Result<PlannerConfig, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw)
}

#[cfg(test)]
mod tests {
    use super::{load_config, parse_config, ConfigError, PlannerConfig};
    use crate::logging::default_log_level;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("{}").expect("empty object should parse");
        assert_eq!(config, PlannerConfig::default());
        assert_eq!(config.time_zone, "America/Chicago");
        assert_eq!(config.free_busy_days, 7);
    }

    #[test]
    fn recurrence_until_parses_as_date() {
        let config = parse_config(r#"{"recurrence_until": "2025-12-31"}"#)
            .expect("date should parse");
        assert_eq!(
            config.recurrence_until,
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let unknown_zone = parse_config(r#"{"time_zone": "Mars/Olympus"}"#)
            .expect_err("unknown zone must fail");
        assert!(matches!(unknown_zone, ConfigError::UnknownTimeZone(_)));

        let empty_calendar =
            parse_config(r#"{"calendar_id": "  "}"#).expect_err("empty calendar must fail");
        assert!(matches!(empty_calendar, ConfigError::EmptyField("calendar_id")));

        let zero_days =
            parse_config(r#"{"free_busy_days": 0}"#).expect_err("zero lookahead must fail");
        assert!(matches!(zero_days, ConfigError::ZeroLookahead));

        let bad_level =
            parse_config(r#"{"log_level": "loud"}"#).expect_err("bad level must fail");
        assert!(matches!(bad_level, ConfigError::InvalidLogLevel(_)));
    }

    #[test]
    fn effective_log_level_prefers_configured_value() {
        let configured = parse_config(r#"{"log_level": "warn"}"#).expect("level should parse");
        assert_eq!(configured.effective_log_level(), "warn");

        let fallback = PlannerConfig::default();
        assert_eq!(fallback.effective_log_level(), default_log_level());
    }

    #[test]
    fn lookahead_range_spans_configured_days() {
        let config = parse_config(r#"{"free_busy_days": 3}"#).expect("config should parse");
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).unwrap();
        let range = config.lookahead_range(&now);
        assert_eq!(range.start(), now);
        assert_eq!(range.duration(), Duration::days(3));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let error = parse_config(r#"{"timezone": "UTC"}"#).expect_err("typo key must fail");
        assert!(matches!(error, ConfigError::Json(_)));
    }

    #[test]
    fn load_config_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"time_zone": "Europe/Berlin", "calendar_id": "work"}}"#)
            .expect("write config");
        let config = load_config(file.path()).expect("config should load");
        assert_eq!(config.time_zone, "Europe/Berlin");
        assert_eq!(config.calendar_id, "work");
        assert_eq!(config.task_list_id, "@default");
        config.schedule_parser().expect("parser should build");
    }

    #[test]
    fn load_config_reports_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = load_config(dir.path().join("absent.json")).expect_err("missing file");
        assert!(matches!(error, ConfigError::Io { .. }));
    }
}
