//! Collaborator contracts for calendar, task and link storage.
//!
//! # Responsibility
//! - Define the Event Store, Task Store and Link Store seams consumed by
//!   availability resolution and task/event synchronization.
//! - Provide one error taxonomy shared by every adapter.
//!
//! # Invariants
//! - `StoreError::NotFound` is the only authoritative "gone upstream" signal.
//! - Every other failure is transient and must never drop a link.
//! - Adapters own timeout/retry policy; the core never sleeps or retries.

use crate::db::DbError;
use crate::model::event::EventSpec;
use crate::model::link::{EventRef, TaskEventLink};
use crate::model::task::TaskRecord;
use crate::model::window::TimeWindow;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a store adapter.
#[derive(Debug)]
pub enum StoreError {
    /// Target task, event or link does not exist upstream.
    NotFound(String),
    /// Network/auth/rate-limit failure; retried on a later pass.
    Transient(String),
    /// Local link persistence failure.
    Db(DbError),
}

impl StoreError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Transient(message) => write!(f, "transient store failure: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::Transient(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Event listed from a calendar range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEvent {
    pub event_id: String,
    pub summary: String,
    /// `None` for all-day entries without a concrete time range.
    pub window: Option<TimeWindow>,
}

/// Calendar backend contract.
pub trait EventStore {
    /// Creates one event (or recurring series) and returns its id.
    fn create_event(&self, calendar_id: &str, spec: &EventSpec) -> StoreResult<String>;
    /// Deletes one event or a whole series by parent id.
    fn delete_event(&self, calendar_id: &str, event_id: &str) -> StoreResult<()>;
    /// Returns raw busy intervals inside `range`; may be unsorted/overlapping.
    fn query_free_busy(&self, calendar_id: &str, range: &TimeWindow)
        -> StoreResult<Vec<TimeWindow>>;
    /// Lists single-instance events intersecting `range`.
    fn list_events(&self, calendar_id: &str, range: &TimeWindow) -> StoreResult<Vec<ListedEvent>>;
}

/// Task backend contract.
pub trait TaskStore {
    fn create_task(
        &self,
        task_list_id: &str,
        title: &str,
        due: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<String>;
    fn get_task(&self, task_list_id: &str, task_id: &str) -> StoreResult<TaskRecord>;
    fn delete_task(&self, task_list_id: &str, task_id: &str) -> StoreResult<()>;
}

/// Durable task/event link contract.
///
/// Mutations on a missing link return `StoreError::NotFound`.
pub trait LinkStore {
    /// Inserts or fully replaces the link for `link.task_id`.
    fn put(&self, link: &TaskEventLink) -> StoreResult<()>;
    fn get(&self, task_id: &str) -> StoreResult<Option<TaskEventLink>>;
    /// Appends one pair; appending an existing pair is a no-op.
    fn append_event_link(&self, task_id: &str, event: &EventRef) -> StoreResult<()>;
    /// Removes one pair and returns whether it was present.
    fn remove_event_link(&self, task_id: &str, event: &EventRef) -> StoreResult<bool>;
    fn delete(&self, task_id: &str) -> StoreResult<()>;
    /// Snapshot of every link, ordered by `task_id`.
    fn list_all(&self) -> StoreResult<Vec<TaskEventLink>>;
}

impl<S: EventStore + ?Sized> EventStore for &S {
    fn create_event(&self, calendar_id: &str, spec: &EventSpec) -> StoreResult<String> {
        (**self).create_event(calendar_id, spec)
    }

    fn delete_event(&self, calendar_id: &str, event_id: &str) -> StoreResult<()> {
        (**self).delete_event(calendar_id, event_id)
    }

    fn query_free_busy(
        &self,
        calendar_id: &str,
        range: &TimeWindow,
    ) -> StoreResult<Vec<TimeWindow>> {
        (**self).query_free_busy(calendar_id, range)
    }

    fn list_events(&self, calendar_id: &str, range: &TimeWindow) -> StoreResult<Vec<ListedEvent>> {
        (**self).list_events(calendar_id, range)
    }
}

impl<S: TaskStore + ?Sized> TaskStore for &S {
    fn create_task(
        &self,
        task_list_id: &str,
        title: &str,
        due: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<String> {
        (**self).create_task(task_list_id, title, due)
    }

    fn get_task(&self, task_list_id: &str, task_id: &str) -> StoreResult<TaskRecord> {
        (**self).get_task(task_list_id, task_id)
    }

    fn delete_task(&self, task_list_id: &str, task_id: &str) -> StoreResult<()> {
        (**self).delete_task(task_list_id, task_id)
    }
}

impl<S: LinkStore + ?Sized> LinkStore for &S {
    fn put(&self, link: &TaskEventLink) -> StoreResult<()> {
        (**self).put(link)
    }

    fn get(&self, task_id: &str) -> StoreResult<Option<TaskEventLink>> {
        (**self).get(task_id)
    }

    fn append_event_link(&self, task_id: &str, event: &EventRef) -> StoreResult<()> {
        (**self).append_event_link(task_id, event)
    }

    fn remove_event_link(&self, task_id: &str, event: &EventRef) -> StoreResult<bool> {
        (**self).remove_event_link(task_id, event)
    }

    fn delete(&self, task_id: &str) -> StoreResult<()> {
        (**self).delete(task_id)
    }

    fn list_all(&self) -> StoreResult<Vec<TaskEventLink>> {
        (**self).list_all()
    }
}
