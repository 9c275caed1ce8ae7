use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::America::Chicago;
use lazyplan_core::{ParseError, ScheduleLineParser, Weekday};

fn chicago_parser() -> ScheduleLineParser {
    ScheduleLineParser::from_zone_name("America/Chicago").unwrap()
}

// 2025-12-01 is a Monday.
fn monday_at(hour: u32) -> chrono::DateTime<chrono_tz::Tz> {
    Chicago.with_ymd_and_hms(2025, 12, 1, hour, 0, 0).unwrap()
}

#[test]
fn same_day_is_kept_while_start_has_not_elapsed() {
    let parser = chicago_parser();
    let line = "Standup on Monday: 10:00 AM - 10:30 AM";

    let before = parser.parse_line(line, &monday_at(9)).unwrap();
    assert_eq!(before.start_rfc3339(), "2025-12-01T10:00:00-06:00");

    let after = parser.parse_line(line, &monday_at(11)).unwrap();
    assert_eq!(after.start_rfc3339(), "2025-12-08T10:00:00-06:00");
    assert_eq!(after.window().duration(), Duration::minutes(30));
}

#[test]
fn overnight_range_ends_on_following_day() {
    let parser = chicago_parser();
    let spec = parser
        .parse_line("Sleep on Friday: 10:00 PM - 2:00 AM", &monday_at(9))
        .unwrap();

    assert_eq!(spec.start_rfc3339(), "2025-12-05T22:00:00-06:00");
    assert_eq!(spec.end_rfc3339(), "2025-12-06T02:00:00-06:00");
    assert_eq!(spec.window().duration(), Duration::hours(4));
    assert_eq!(spec.description, "Sleep on Friday");
    assert!(!spec.is_recurring());
}

#[test]
fn weekly_line_produces_recurrence_rule() {
    let parser = chicago_parser();
    let spec = parser
        .parse_line(
            "Gaming event Every Monday: 8:00 PM - 10:00 PM (2 hours)",
            &monday_at(9),
        )
        .unwrap();

    assert_eq!(spec.summary, "Gaming event");
    assert_eq!(spec.description, "Gaming event every Monday");
    assert_eq!(spec.window().duration(), Duration::hours(2));
    let rule = spec.recurrence.unwrap();
    assert_eq!(rule.by_day, Weekday::Monday);
    assert_eq!(
        rule.to_rrule(),
        "RRULE:FREQ=WEEKLY;BYDAY=MO;UNTIL=20251231T235959Z"
    );
}

#[test]
fn parsed_times_round_trip_to_civil_time() {
    let parser = chicago_parser();
    let spec = parser
        .parse_line("Gaming event Every Monday: 8:00 PM - 10:00 PM", &monday_at(9))
        .unwrap();

    let local_start = spec.start().with_timezone(&Chicago);
    assert_eq!(local_start.weekday(), chrono::Weekday::Mon);
    assert_eq!(local_start.time(), NaiveTime::from_hms_opt(20, 0, 0).unwrap());
    assert_eq!(spec.end().with_timezone(&Chicago).hour(), 22);
    assert_eq!(spec.time_zone, "America/Chicago");
}

#[test]
fn line_without_day_clause_is_malformed() {
    let parser = chicago_parser();
    let err = parser
        .parse_line("Gaming event 8:00 PM - 10:00 PM", &monday_at(9))
        .unwrap_err();
    assert!(matches!(err, ParseError::Malformed(_)));
}

#[test]
fn keywords_and_day_names_ignore_case() {
    let parser = chicago_parser();
    let spec = parser
        .parse_line("Lunch ON wednesday: 12:00 pm \u{2013} 1:00 pm", &monday_at(9))
        .unwrap();
    assert_eq!(spec.start_rfc3339(), "2025-12-03T12:00:00-06:00");
}

#[test]
fn offsets_follow_dst_per_occurrence() {
    let parser = chicago_parser();
    // Saturday before and after the 2025-11-02 fall-back.
    let before = Chicago.with_ymd_and_hms(2025, 10, 25, 9, 0, 0).unwrap();
    let after = Chicago.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap();
    let line = "Brunch on Sunday: 10:00 AM - 11:00 AM";

    assert_eq!(
        parser.parse_line(line, &before).unwrap().start_rfc3339(),
        "2025-10-26T10:00:00-05:00"
    );
    assert_eq!(
        parser.parse_line(line, &after).unwrap().start_rfc3339(),
        "2025-11-02T10:00:00-06:00"
    );
}

#[test]
fn ambiguous_local_time_takes_earliest_reading() {
    let parser = chicago_parser();
    let now = Chicago.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap();
    let spec = parser
        .parse_line("Night shift on Sunday: 1:30 AM - 3:00 AM", &now)
        .unwrap();
    assert_eq!(spec.start_rfc3339(), "2025-11-02T01:30:00-05:00");
    assert_eq!(spec.end_rfc3339(), "2025-11-02T03:00:00-06:00");
    assert_eq!(spec.window().duration(), Duration::minutes(150));
}

#[test]
fn spring_forward_gap_is_an_error() {
    let parser = chicago_parser();
    // 2025-03-08 is a Saturday; 2:30 AM on the 9th does not exist.
    let now = Chicago.with_ymd_and_hms(2025, 3, 8, 9, 0, 0).unwrap();
    let err = parser
        .parse_line("Backup on Sunday: 2:30 AM - 4:00 AM", &now)
        .unwrap_err();
    assert_eq!(err.code(), "nonexistent_local_time");
}

#[test]
fn default_horizon_rolls_into_next_year() {
    let parser = chicago_parser();
    // Monday evening after the start: first occurrence is 2026-01-05.
    let now = Chicago.with_ymd_and_hms(2025, 12, 29, 21, 0, 0).unwrap();
    let spec = parser
        .parse_line("Gaming event Every Monday: 8:00 PM - 10:00 PM", &now)
        .unwrap();
    assert_eq!(spec.start_rfc3339(), "2026-01-05T20:00:00-06:00");
    assert_eq!(
        spec.recurrence.unwrap().until,
        NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()
    );
}

#[test]
fn configured_horizon_must_follow_first_occurrence() {
    let until = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
    let parser = chicago_parser().with_recurrence_until(until);
    let err = parser
        .parse_line("Gaming event Every Monday: 8:00 PM - 10:00 PM", &monday_at(9))
        .unwrap_err();
    assert_eq!(err, ParseError::HorizonBeforeStart(until));

    let later = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
    let spec = chicago_parser()
        .with_recurrence_until(later)
        .parse_line("Gaming event Every Monday: 8:00 PM - 10:00 PM", &monday_at(9))
        .unwrap();
    assert_eq!(spec.recurrence.unwrap().until, later);
}

#[test]
fn now_in_other_zone_is_converted_first() {
    let parser = chicago_parser();
    // 2025-12-01 16:00 UTC is 10:00 AM in Chicago, past a 9:00 AM start.
    let now = Utc.with_ymd_and_hms(2025, 12, 1, 16, 0, 0).unwrap();
    let spec = parser
        .parse_line("Gym on Monday: 9:00 AM - 10:00 AM", &now)
        .unwrap();
    assert_eq!(spec.start_rfc3339(), "2025-12-08T09:00:00-06:00");
}

#[test]
fn block_parse_skips_bad_lines_and_keeps_order() {
    let parser = chicago_parser();
    let text = "\
Standup on Tuesday: 9:00 AM - 9:15 AM
this line is nonsense

Gaming event Every Monday: 8:00 PM - 10:00 PM (2 hours)
Yoga on Funday: 7:00 AM - 8:00 AM
";
    let batch = parser.parse_block(text, &monday_at(9));

    let summaries: Vec<&str> = batch.events.iter().map(|e| e.summary.as_str()).collect();
    assert_eq!(summaries, vec!["Standup", "Gaming event"]);
    assert_eq!(batch.failures.len(), 2);
    assert_eq!(batch.failures[0].line_number, 2);
    assert_eq!(batch.failures[0].error.code(), "malformed_line");
    assert_eq!(batch.failures[1].line_number, 5);
    assert_eq!(batch.failures[1].error.code(), "unknown_day");
}

#[test]
fn event_body_serializes_calendar_payload() {
    let parser = chicago_parser();
    let spec = parser
        .parse_line("Gaming event Every Monday: 8:00 PM - 10:00 PM", &monday_at(9))
        .unwrap();

    let body = serde_json::to_value(spec.to_event_body()).unwrap();
    assert_eq!(body["summary"], "Gaming event");
    assert_eq!(body["start"]["dateTime"], "2025-12-01T20:00:00-06:00");
    assert_eq!(body["start"]["timeZone"], "America/Chicago");
    assert_eq!(body["end"]["dateTime"], "2025-12-01T22:00:00-06:00");
    assert_eq!(
        body["recurrence"][0],
        "RRULE:FREQ=WEEKLY;BYDAY=MO;UNTIL=20251231T235959Z"
    );

    let one_off = parser
        .parse_line("Standup on Tuesday: 9:00 AM - 9:15 AM", &monday_at(9))
        .unwrap();
    let body = serde_json::to_value(one_off.to_event_body()).unwrap();
    assert!(body.get("recurrence").is_none());
}
