use chrono::{DateTime, Duration, TimeZone, Utc};
use lazyplan_core::schedule::stats::{collect_category_hours, CategoryRules, TimeCategory};
use lazyplan_core::{
    AvailabilityResolver, EventSpec, EventStore, ListedEvent, StoreError, StoreResult, TimeWindow,
};
use std::cell::RefCell;

/// Event store double answering free/busy from a fixed list.
struct FixedCalendar {
    busy: Vec<TimeWindow>,
    listed: Vec<ListedEvent>,
    fail: bool,
    queries: RefCell<Vec<(String, TimeWindow)>>,
}

impl FixedCalendar {
    fn with_busy(busy: Vec<TimeWindow>) -> Self {
        Self {
            busy,
            listed: Vec::new(),
            fail: false,
            queries: RefCell::new(Vec::new()),
        }
    }
}

impl EventStore for FixedCalendar {
    fn create_event(&self, _calendar_id: &str, _spec: &EventSpec) -> StoreResult<String> {
        unreachable!("availability never creates events")
    }

    fn delete_event(&self, _calendar_id: &str, _event_id: &str) -> StoreResult<()> {
        unreachable!("availability never deletes events")
    }

    fn query_free_busy(&self, calendar_id: &str, range: &TimeWindow) -> StoreResult<Vec<TimeWindow>> {
        self.queries
            .borrow_mut()
            .push((calendar_id.to_string(), *range));
        if self.fail {
            return Err(StoreError::transient("calendar unavailable"));
        }
        Ok(self.busy.clone())
    }

    fn list_events(&self, _calendar_id: &str, _range: &TimeWindow) -> StoreResult<Vec<ListedEvent>> {
        Ok(self.listed.clone())
    }
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 1, hour, minute, 0).unwrap()
}

fn window(start: (u32, u32), end: (u32, u32)) -> TimeWindow {
    TimeWindow::new(at(start.0, start.1), at(end.0, end.1)).unwrap()
}

#[test]
fn overlapping_busy_blocks_merge_before_complement() {
    let calendar = FixedCalendar::with_busy(vec![
        window((13, 0), (14, 0)),
        window((9, 0), (10, 0)),
        window((9, 30), (11, 0)),
        window((11, 0), (11, 30)),
    ]);
    let resolver = AvailabilityResolver::new(&calendar);

    let free = resolver
        .resolve_free_windows(&window((8, 0), (17, 0)), "primary")
        .unwrap();

    assert_eq!(
        free,
        vec![
            window((8, 0), (9, 0)),
            window((11, 30), (13, 0)),
            window((14, 0), (17, 0)),
        ]
    );
    assert_eq!(calendar.queries.borrow()[0].0, "primary");
}

#[test]
fn free_and_busy_partition_the_range() {
    let busy = vec![window((7, 0), (9, 30)), window((12, 0), (12, 45)), window((16, 30), (18, 0))];
    let calendar = FixedCalendar::with_busy(busy);
    let resolver = AvailabilityResolver::new(&calendar);
    let range = window((8, 0), (17, 0));

    let free = resolver.resolve_free_windows(&range, "primary").unwrap();
    let free_total: Duration = free.iter().map(TimeWindow::duration).sum();
    let busy_in_range = Duration::minutes(90 + 45 + 30);

    assert_eq!(free_total + busy_in_range, range.duration());
    for pair in free.windows(2) {
        assert!(pair[0].end() < pair[1].start());
    }
}

#[test]
fn empty_calendar_is_free_for_whole_range() {
    let calendar = FixedCalendar::with_busy(Vec::new());
    let resolver = AvailabilityResolver::new(&calendar);
    let range = window((8, 0), (17, 0));

    assert_eq!(resolver.resolve_free_windows(&range, "primary").unwrap(), vec![range]);
}

#[test]
fn store_failure_is_propagated() {
    let mut calendar = FixedCalendar::with_busy(Vec::new());
    calendar.fail = true;
    let resolver = AvailabilityResolver::new(&calendar);

    let err = resolver
        .resolve_free_windows(&window((8, 0), (17, 0)), "primary")
        .unwrap_err();
    assert!(matches!(err, StoreError::Transient(_)));
}

#[test]
fn upcoming_range_spans_requested_days() {
    let calendar = FixedCalendar::with_busy(Vec::new());
    let resolver = AvailabilityResolver::new(&calendar);
    let now = at(8, 0);

    let free = resolver.resolve_upcoming(&now, 7, "work").unwrap();

    let (calendar_id, range) = calendar.queries.borrow()[0].clone();
    assert_eq!(calendar_id, "work");
    assert_eq!(range.start(), now);
    assert_eq!(range.end(), now + Duration::days(7));
    assert_eq!(free, vec![range]);
}

#[test]
fn short_gaps_are_filtered_by_minimum_length() {
    let calendar = FixedCalendar::with_busy(vec![window((9, 0), (9, 50)), window((10, 0), (12, 0))]);
    let resolver = AvailabilityResolver::new(&calendar);

    let free = resolver
        .resolve_free_windows_at_least(&window((9, 0), (13, 0)), "primary", Duration::minutes(30))
        .unwrap();
    assert_eq!(free, vec![window((12, 0), (13, 0))]);
}

#[test]
fn weekly_stats_sum_hours_per_category() {
    let mut calendar = FixedCalendar::with_busy(Vec::new());
    calendar.listed = vec![
        ListedEvent {
            event_id: "e1".to_string(),
            summary: "Team meeting".to_string(),
            window: Some(window((9, 0), (10, 30))),
        },
        ListedEvent {
            event_id: "e2".to_string(),
            summary: "Nap".to_string(),
            window: Some(window((13, 0), (14, 0))),
        },
        ListedEvent {
            event_id: "e3".to_string(),
            summary: "Holiday".to_string(),
            window: None,
        },
    ];

    let hours = collect_category_hours(
        &calendar,
        "primary",
        &window((0, 0), (23, 0)),
        &CategoryRules::default(),
    )
    .unwrap();

    assert_eq!(hours[&TimeCategory::Work], 1.5);
    assert_eq!(hours[&TimeCategory::Sleep], 1.0);
    assert_eq!(hours[&TimeCategory::Leisure], 0.0);
    assert_eq!(hours[&TimeCategory::Other], 0.0);
}
