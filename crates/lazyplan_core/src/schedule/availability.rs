//! Free-window resolution against an Event Store.
//!
//! # Responsibility
//! - Query free/busy for one calendar, normalize it, return the gaps.
//! - Produce grounding candidates for downstream suggestion steps; no
//!   ranking happens here.

use crate::model::window::TimeWindow;
use crate::schedule::interval::{complement, normalize};
use crate::store::{EventStore, StoreResult};
use chrono::{DateTime, Duration, TimeZone, Utc};
use log::{debug, warn};

/// `[now, now + days)`, saturating at the latest representable instant.
pub fn upcoming_range<Z: TimeZone>(now: &DateTime<Z>, days: u32) -> TimeWindow {
    let start = now.with_timezone(&Utc);
    let end = start
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    TimeWindow::from_ordered(start, end)
}

/// Answers "when am I free" for a calendar.
pub struct AvailabilityResolver<E: EventStore> {
    events: E,
}

impl<E: EventStore> AvailabilityResolver<E> {
    pub fn new(events: E) -> Self {
        Self { events }
    }

    /// Returns free sub-windows of `range` for `calendar_id`.
    ///
    /// # Errors
    /// - Propagates Event Store failures unchanged.
    pub fn resolve_free_windows(
        &self,
        range: &TimeWindow,
        calendar_id: &str,
    ) -> StoreResult<Vec<TimeWindow>> {
        let raw = match self.events.query_free_busy(calendar_id, range) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    "event=free_busy_query module=availability status=error calendar_id={} error={}",
                    calendar_id, err
                );
                return Err(err);
            }
        };
        let raw_count = raw.len();
        let busy = normalize(raw);
        let free = complement(range, &busy);
        debug!(
            "event=free_busy_query module=availability status=ok calendar_id={} busy_raw={} busy_merged={} free={}",
            calendar_id,
            raw_count,
            busy.len(),
            free.len()
        );
        Ok(free)
    }

    /// Resolves free windows over `[now, now + days)`.
    pub fn resolve_upcoming<Z: TimeZone>(
        &self,
        now: &DateTime<Z>,
        days: u32,
        calendar_id: &str,
    ) -> StoreResult<Vec<TimeWindow>> {
        self.resolve_free_windows(&upcoming_range(now, days), calendar_id)
    }

    /// Same as `resolve_free_windows`, keeping only windows of at least
    /// `min_length`.
    pub fn resolve_free_windows_at_least(
        &self,
        range: &TimeWindow,
        calendar_id: &str,
        min_length: Duration,
    ) -> StoreResult<Vec<TimeWindow>> {
        Ok(self
            .resolve_free_windows(range, calendar_id)?
            .into_iter()
            .filter(|window| window.duration() >= min_length)
            .collect())
    }
}
