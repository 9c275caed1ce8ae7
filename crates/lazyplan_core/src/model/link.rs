//! Durable task/event association.
//!
//! # Responsibility
//! - Describe which calendar events were created on behalf of one task.
//!
//! # Invariants
//! - One link per `task_id`.
//! - `links` keeps insertion order and holds no duplicate pair.
//! - `last_updated_at >= created_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One `(event_id, calendar_id)` pair owned by a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventRef {
    pub event_id: String,
    pub calendar_id: String,
}

impl EventRef {
    pub fn new(event_id: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            calendar_id: calendar_id.into(),
        }
    }
}

/// Association between a task and the events it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEventLink {
    pub task_id: String,
    pub task_list_id: String,
    pub links: Vec<EventRef>,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl TaskEventLink {
    /// Creates a fresh link stamped at `now`.
    pub fn new(
        task_id: impl Into<String>,
        task_list_id: impl Into<String>,
        links: Vec<EventRef>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut deduped: Vec<EventRef> = Vec::with_capacity(links.len());
        for event in links {
            if !deduped.contains(&event) {
                deduped.push(event);
            }
        }
        Self {
            task_id: task_id.into(),
            task_list_id: task_list_id.into(),
            links: deduped,
            created_at: now,
            last_updated_at: now,
        }
    }

    pub fn contains(&self, event: &EventRef) -> bool {
        self.links.contains(event)
    }
}
