//! Set algebra over time windows.
//!
//! # Invariants
//! - `BusySet` is sorted by start, non-overlapping, non-touching and holds
//!   no zero-length window.
//! - All comparisons happen on UTC instants.

use crate::model::window::TimeWindow;

/// Normalized busy intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusySet {
    windows: Vec<TimeWindow>,
}

impl BusySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn into_windows(self) -> Vec<TimeWindow> {
        self.windows
    }
}

impl FromIterator<TimeWindow> for BusySet {
    fn from_iter<I: IntoIterator<Item = TimeWindow>>(iter: I) -> Self {
        normalize(iter)
    }
}

/// Sorts and coalesces windows into a `BusySet`.
///
/// Overlapping and touching windows merge; zero-length windows are dropped.
pub fn normalize<I>(windows: I) -> BusySet
where
    I: IntoIterator<Item = TimeWindow>,
{
    let mut sorted: Vec<TimeWindow> = windows
        .into_iter()
        .filter(|window| !window.is_empty())
        .collect();
    sorted.sort_by_key(|window| (window.start(), window.end()));

    let mut merged: Vec<TimeWindow> = Vec::with_capacity(sorted.len());
    for window in sorted {
        match merged.last_mut() {
            Some(last) if window.start() <= last.end() => {
                if window.end() > last.end() {
                    *last = TimeWindow::from_ordered(last.start(), window.end());
                }
            }
            _ => merged.push(window),
        }
    }

    BusySet { windows: merged }
}

/// Returns the maximal sub-windows of `range` not covered by `busy`.
///
/// Busy windows reaching outside `range` are clipped to it.
pub fn complement(range: &TimeWindow, busy: &BusySet) -> Vec<TimeWindow> {
    let mut free = Vec::new();
    let mut cursor = range.start();

    for window in busy.windows() {
        if window.end() <= cursor {
            continue;
        }
        if window.start() >= range.end() {
            break;
        }
        if window.start() > cursor {
            free.push(TimeWindow::from_ordered(cursor, window.start()));
        }
        cursor = cursor.max(window.end());
        if cursor >= range.end() {
            break;
        }
    }

    if cursor < range.end() {
        free.push(TimeWindow::from_ordered(cursor, range.end()));
    }
    free
}
