//! Weekly time-by-category statistics.
//!
//! # Responsibility
//! - Bucket calendar events into keyword categories and sum their hours.
//!
//! # Invariants
//! - The first category whose keyword occurs in the summary wins.
//! - All-day events (no concrete window) are skipped.
//! - Durations are clipped to the queried range.

use crate::model::window::TimeWindow;
use crate::store::{EventStore, ListedEvent, StoreResult};
use chrono::{DateTime, Datelike, Days, Duration, TimeZone, Utc};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

/// Time category for weekly statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TimeCategory {
    Sleep,
    Work,
    Leisure,
    Other,
}

impl TimeCategory {
    pub const ALL: [TimeCategory; 4] = [
        TimeCategory::Sleep,
        TimeCategory::Work,
        TimeCategory::Leisure,
        TimeCategory::Other,
    ];
}

/// Ordered keyword rules; unmatched events fall into `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRules {
    rules: Vec<(TimeCategory, Vec<String>)>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        let words = |items: &[&str]| -> Vec<String> {
            items.iter().map(|item| item.to_lowercase()).collect()
        };
        Self {
            rules: vec![
                (TimeCategory::Sleep, words(&["Sleep", "Nap", "Rest", "Asleep"])),
                (
                    TimeCategory::Work,
                    words(&["Work", "Meeting", "Client", "Project", "Sprint", "Standup"]),
                ),
                (
                    TimeCategory::Leisure,
                    words(&[
                        "Gym",
                        "Workout",
                        "Hobby",
                        "Reading",
                        "Movie",
                        "Personal Project",
                        "Run",
                    ]),
                ),
            ],
        }
    }
}

impl CategoryRules {
    /// Builds rules from `(category, keywords)` pairs in priority order.
    pub fn new(rules: Vec<(TimeCategory, Vec<String>)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(category, keywords)| {
                    (
                        category,
                        keywords.iter().map(|keyword| keyword.to_lowercase()).collect(),
                    )
                })
                .collect(),
        }
    }

    pub fn categorize(&self, summary: &str) -> TimeCategory {
        let summary = summary.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| summary.contains(keyword.as_str())))
            .map_or(TimeCategory::Other, |(category, _)| *category)
    }
}

/// Sums hours per category for events inside `range`.
///
/// Every category is present in the result, zero when unused.
pub fn category_hours(
    events: &[ListedEvent],
    range: &TimeWindow,
    rules: &CategoryRules,
) -> BTreeMap<TimeCategory, f64> {
    let mut totals: BTreeMap<TimeCategory, Duration> = TimeCategory::ALL
        .into_iter()
        .map(|category| (category, Duration::zero()))
        .collect();

    for event in events {
        let Some(window) = event.window.and_then(|window| window.clip_to(range)) else {
            continue;
        };
        let category = rules.categorize(&event.summary);
        if let Some(total) = totals.get_mut(&category) {
            *total += window.duration();
        }
    }

    totals
        .into_iter()
        .map(|(category, total)| (category, total.num_seconds() as f64 / 3600.0))
        .collect()
}

/// Lists events for `range` and sums hours per category.
pub fn collect_category_hours<E: EventStore>(
    events: &E,
    calendar_id: &str,
    range: &TimeWindow,
    rules: &CategoryRules,
) -> StoreResult<BTreeMap<TimeCategory, f64>> {
    let listed = events.list_events(calendar_id, range)?;
    debug!(
        "event=weekly_stats module=stats status=ok calendar_id={} events={}",
        calendar_id,
        listed.len()
    );
    Ok(category_hours(&listed, range, rules))
}

/// Sunday-to-Sunday UTC week containing `now`.
pub fn week_range<Z: TimeZone>(now: &DateTime<Z>) -> TimeWindow {
    let today = now.with_timezone(&Utc).date_naive();
    let back = u64::from(today.weekday().num_days_from_sunday());
    let sunday = today.checked_sub_days(Days::new(back)).unwrap_or(today);
    let start = Utc.from_utc_datetime(&sunday.and_time(chrono::NaiveTime::MIN));
    let end = start
        .checked_add_signed(Duration::days(7))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    TimeWindow::from_ordered(start, end)
}

#[cfg(test)]
mod tests {
    use super::{category_hours, week_range, CategoryRules, TimeCategory};
    use crate::model::window::TimeWindow;
    use crate::store::ListedEvent;
    use chrono::{TimeZone, Utc};

    fn listed(summary: &str, start: &str, end: &str) -> ListedEvent {
        ListedEvent {
            event_id: summary.to_string(),
            summary: summary.to_string(),
            window: Some(TimeWindow::parse_rfc3339(start, end).unwrap()),
        }
    }

    #[test]
    fn categorize_uses_first_matching_rule() {
        let rules = CategoryRules::default();
        assert_eq!(rules.categorize("Afternoon NAP"), TimeCategory::Sleep);
        assert_eq!(rules.categorize("Client meeting"), TimeCategory::Work);
        assert_eq!(rules.categorize("Gym session"), TimeCategory::Leisure);
        assert_eq!(rules.categorize("Dentist"), TimeCategory::Other);
    }

    #[test]
    fn category_hours_clips_and_skips_all_day_events() {
        let range = TimeWindow::parse_rfc3339("2025-03-09T00:00:00Z", "2025-03-16T00:00:00Z")
            .unwrap();
        let events = vec![
            listed("Sleep", "2025-03-08T22:00:00Z", "2025-03-09T06:00:00Z"),
            listed("Standup", "2025-03-10T09:00:00Z", "2025-03-10T09:30:00Z"),
            listed("Dinner", "2025-03-11T18:00:00Z", "2025-03-11T19:00:00Z"),
            ListedEvent {
                event_id: "holiday".to_string(),
                summary: "Holiday".to_string(),
                window: None,
            },
        ];

        let hours = category_hours(&events, &range, &CategoryRules::default());
        assert_eq!(hours[&TimeCategory::Sleep], 6.0);
        assert_eq!(hours[&TimeCategory::Work], 0.5);
        assert_eq!(hours[&TimeCategory::Other], 1.0);
        assert_eq!(hours[&TimeCategory::Leisure], 0.0);
    }

    #[test]
    fn week_range_starts_on_sunday() {
        let wednesday = Utc.with_ymd_and_hms(2025, 3, 12, 15, 0, 0).unwrap();
        let range = week_range(&wednesday);
        assert_eq!(range.start(), Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap());
        assert_eq!(range.end(), Utc.with_ymd_and_hms(2025, 3, 16, 0, 0, 0).unwrap());

        let sunday = Utc.with_ymd_and_hms(2025, 3, 16, 8, 0, 0).unwrap();
        assert_eq!(
            week_range(&sunday).start(),
            Utc.with_ymd_and_hms(2025, 3, 16, 0, 0, 0).unwrap()
        );
    }
}
