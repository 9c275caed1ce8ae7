//! Task/event synchronization service.
//!
//! # Responsibility
//! - Create a task, its calendar event and the link between them.
//! - Reconcile every link against task state: tear down events of
//!   completed tasks and drop links of vanished tasks.
//!
//! # Invariants
//! - A reconciliation pass iterates a snapshot of the link store and
//!   commits link removals only after every task was classified.
//! - Any store failure other than `NotFound` defers the task to the next
//!   pass; its link is never removed on a transient failure.
//! - A missing task drops its link without touching events; a completed
//!   task deletes every linked event first.
//! - Only one pass runs at a time per synchronizer.

use crate::model::event::EventSpec;
use crate::model::link::{EventRef, TaskEventLink};
use crate::store::{EventStore, LinkStore, StoreError, StoreResult, TaskStore};
use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, TryLockError};
use uuid::Uuid;

/// Partial-failure signal of the create/attach paths.
///
/// Every variant carries the identifiers created before the failing step
/// so callers can retry or discard them; nothing is rolled back.
#[derive(Debug)]
pub enum CreateLinkError {
    /// Task creation failed; nothing was created.
    TaskCreation(StoreError),
    /// Task exists, event creation failed, no link was written.
    EventCreation { task_id: String, source: StoreError },
    /// Task and event exist, the link write failed.
    LinkWrite {
        task_id: String,
        event_id: String,
        source: StoreError,
    },
    /// `attach_event` target has no link.
    LinkMissing(String),
    /// `attach_event` could not read the target link.
    LinkLookup(StoreError),
}

impl CreateLinkError {
    /// Task id obtained before the failure, if any.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskCreation(_) | Self::LinkLookup(_) => None,
            Self::EventCreation { task_id, .. } | Self::LinkWrite { task_id, .. } => Some(task_id),
            Self::LinkMissing(task_id) => Some(task_id),
        }
    }

    /// Event id obtained before the failure, if any.
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::LinkWrite { event_id, .. } => Some(event_id),
            _ => None,
        }
    }
}

impl Display for CreateLinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskCreation(err) => write!(f, "task creation failed: {err}"),
            Self::EventCreation { task_id, source } => {
                write!(f, "task {task_id} created but event creation failed: {source}")
            }
            Self::LinkWrite {
                task_id,
                event_id,
                source,
            } => write!(
                f,
                "task {task_id} and event {event_id} created but link write failed: {source}"
            ),
            Self::LinkMissing(task_id) => write!(f, "no link exists for task {task_id}"),
            Self::LinkLookup(err) => write!(f, "link lookup failed: {err}"),
        }
    }
}

impl Error for CreateLinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::TaskCreation(err) | Self::LinkLookup(err) => Some(err),
            Self::EventCreation { source, .. } | Self::LinkWrite { source, .. } => Some(source),
            Self::LinkMissing(_) => None,
        }
    }
}

/// Failure that prevents a reconciliation pass from running at all.
#[derive(Debug)]
pub enum ReconcileError {
    /// Another pass holds the run lock.
    PassInProgress,
    /// The link snapshot could not be read.
    Snapshot(StoreError),
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PassInProgress => write!(f, "a reconciliation pass is already running"),
            Self::Snapshot(err) => write!(f, "failed to snapshot links: {err}"),
        }
    }
}

impl Error for ReconcileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PassInProgress => None,
            Self::Snapshot(err) => Some(err),
        }
    }
}

/// Identifiers produced by a successful create path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedCreation {
    pub task_id: String,
    pub task_list_id: String,
    pub event: EventRef,
}

/// Observed state of one linked task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Task exists and is still open.
    Active,
    /// Task exists and is completed.
    Completed,
    /// Task lookup reported `NotFound`.
    TaskMissing,
}

/// Task left untouched for the next pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeferredTask {
    pub task_id: String,
    pub reason: String,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Correlation id also written to every log line of the pass.
    pub pass_id: Uuid,
    pub checked: usize,
    pub active: Vec<String>,
    pub completed: Vec<String>,
    pub missing: Vec<String>,
    pub deferred: Vec<DeferredTask>,
    /// Successful `delete_event` calls (already-gone events excluded).
    pub events_deleted: usize,
    pub links_removed: usize,
    /// Pass stopped early; unvisited tasks wait for the next pass.
    pub cancelled: bool,
}

enum PendingCommit {
    RemoveLink(String),
    PruneEvents(String, Vec<EventRef>),
}

/// Keeps task completion and event existence consistent.
pub struct TaskEventSynchronizer<E: EventStore, T: TaskStore, L: LinkStore> {
    events: E,
    tasks: T,
    links: L,
    run_lock: Mutex<()>,
}

impl<E: EventStore, T: TaskStore, L: LinkStore> TaskEventSynchronizer<E, T, L> {
    pub fn new(events: E, tasks: T, links: L) -> Self {
        Self {
            events,
            tasks,
            links,
            run_lock: Mutex::new(()),
        }
    }

    /// Creates a task, then its event, then the link.
    ///
    /// The task title and due instant come from `spec.summary` and the
    /// start of its (first) occurrence.
    ///
    /// # Errors
    /// - `CreateLinkError` describing which leg failed and which ids exist.
    pub fn create_linked_task_and_event(
        &self,
        task_list_id: &str,
        calendar_id: &str,
        spec: &EventSpec,
    ) -> Result<LinkedCreation, CreateLinkError> {
        let task_id = self
            .tasks
            .create_task(task_list_id, &spec.summary, spec.window().start())
            .map_err(|err| {
                error!(
                    "event=linked_create module=sync status=error stage=task error={}",
                    err
                );
                CreateLinkError::TaskCreation(err)
            })?;

        let event_id = match self.events.create_event(calendar_id, spec) {
            Ok(event_id) => event_id,
            Err(source) => {
                error!(
                    "event=linked_create module=sync status=partial stage=event task_id={} error={}",
                    task_id, source
                );
                return Err(CreateLinkError::EventCreation { task_id, source });
            }
        };

        let event = EventRef::new(event_id, calendar_id);
        let link = TaskEventLink::new(
            task_id.as_str(),
            task_list_id,
            vec![event.clone()],
            Utc::now(),
        );
        if let Err(source) = self.links.put(&link) {
            error!(
                "event=linked_create module=sync status=partial stage=link task_id={} event_id={} error={}",
                task_id, event.event_id, source
            );
            return Err(CreateLinkError::LinkWrite {
                task_id,
                event_id: event.event_id,
                source,
            });
        }

        info!(
            "event=linked_create module=sync status=ok task_id={} event_id={} recurring={}",
            task_id,
            event.event_id,
            spec.is_recurring()
        );
        Ok(LinkedCreation {
            task_id,
            task_list_id: task_list_id.to_string(),
            event,
        })
    }

    /// Creates another event for an already linked task and appends it.
    pub fn attach_event(
        &self,
        task_id: &str,
        calendar_id: &str,
        spec: &EventSpec,
    ) -> Result<EventRef, CreateLinkError> {
        match self.links.get(task_id) {
            Ok(Some(_)) => {}
            Ok(None) => return Err(CreateLinkError::LinkMissing(task_id.to_string())),
            Err(err) => return Err(CreateLinkError::LinkLookup(err)),
        }

        let event_id = self
            .events
            .create_event(calendar_id, spec)
            .map_err(|source| CreateLinkError::EventCreation {
                task_id: task_id.to_string(),
                source,
            })?;
        let event = EventRef::new(event_id, calendar_id);

        self.links
            .append_event_link(task_id, &event)
            .map_err(|source| {
                warn!(
                    "event=link_append module=sync status=partial task_id={} event_id={} error={}",
                    task_id, event.event_id, source
                );
                CreateLinkError::LinkWrite {
                    task_id: task_id.to_string(),
                    event_id: event.event_id.clone(),
                    source,
                }
            })?;
        Ok(event)
    }

    /// Deletes one linked event and removes it from the link.
    ///
    /// An event that is already gone still gets unlinked.
    pub fn detach_event(&self, task_id: &str, event: &EventRef) -> StoreResult<bool> {
        delete_event_tolerant(&self.events, event)?;
        self.links.remove_event_link(task_id, event)
    }

    /// Deletes a task together with its linked events and link.
    ///
    /// Events go first, so a failure never leaves a linkless event behind.
    pub fn delete_task_cascade(&self, task_list_id: &str, task_id: &str) -> StoreResult<()> {
        let link = self.links.get(task_id)?;
        if let Some(link) = &link {
            for event in &link.links {
                delete_event_tolerant(&self.events, event)?;
            }
        }

        match self.tasks.delete_task(task_list_id, task_id) {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err),
        }

        if link.is_some() {
            match self.links.delete(task_id) {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }
        info!(
            "event=task_cascade_delete module=sync status=ok task_id={} events={}",
            task_id,
            link.map_or(0, |link| link.links.len())
        );
        Ok(())
    }

    /// Classifies one link by looking up its task.
    ///
    /// # Errors
    /// - Any task lookup failure other than `NotFound`.
    pub fn classify(&self, link: &TaskEventLink) -> StoreResult<LinkState> {
        match self.tasks.get_task(&link.task_list_id, &link.task_id) {
            Ok(task) if task.is_completed() => Ok(LinkState::Completed),
            Ok(_) => Ok(LinkState::Active),
            Err(err) if err.is_not_found() => Ok(LinkState::TaskMissing),
            Err(err) => Err(err),
        }
    }

    /// Runs one full reconciliation pass.
    pub fn reconcile(&self) -> Result<ReconcileReport, ReconcileError> {
        self.reconcile_with_cancel(&AtomicBool::new(false))
    }

    /// Runs one pass, stopping before the next task once `cancel` is set.
    ///
    /// Tasks classified before cancellation still get their removals
    /// committed.
    pub fn reconcile_with_cancel(
        &self,
        cancel: &AtomicBool,
    ) -> Result<ReconcileReport, ReconcileError> {
        let _guard = match self.run_lock.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(ReconcileError::PassInProgress),
            // The lock guards no data; a panicked pass leaves nothing to repair.
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let mut report = ReconcileReport {
            pass_id: Uuid::new_v4(),
            ..ReconcileReport::default()
        };
        let snapshot = self.links.list_all().map_err(|err| {
            error!(
                "event=reconcile module=sync status=error pass_id={} stage=snapshot error={}",
                report.pass_id, err
            );
            ReconcileError::Snapshot(err)
        })?;
        info!(
            "event=reconcile module=sync status=start pass_id={} links={}",
            report.pass_id,
            snapshot.len()
        );

        let mut pending = Vec::new();
        for link in &snapshot {
            if cancel.load(Ordering::Relaxed) {
                report.cancelled = true;
                break;
            }
            report.checked += 1;
            if let Some(commit) = self.process_link(link, &mut report) {
                pending.push(commit);
            }
        }

        self.commit(pending, &mut report);

        info!(
            "event=reconcile module=sync status=ok pass_id={} checked={} active={} completed={} missing={} deferred={} events_deleted={} links_removed={} cancelled={}",
            report.pass_id,
            report.checked,
            report.active.len(),
            report.completed.len(),
            report.missing.len(),
            report.deferred.len(),
            report.events_deleted,
            report.links_removed,
            report.cancelled
        );
        Ok(report)
    }

    fn process_link(
        &self,
        link: &TaskEventLink,
        report: &mut ReconcileReport,
    ) -> Option<PendingCommit> {
        let state = match self.classify(link) {
            Ok(state) => state,
            Err(err) => {
                defer(report, &link.task_id, format!("task lookup failed: {err}"));
                return None;
            }
        };

        match state {
            LinkState::Active => {
                report.active.push(link.task_id.clone());
                None
            }
            LinkState::TaskMissing => {
                report.missing.push(link.task_id.clone());
                Some(PendingCommit::RemoveLink(link.task_id.clone()))
            }
            LinkState::Completed => {
                report.completed.push(link.task_id.clone());
                let mut gone = Vec::with_capacity(link.links.len());
                let mut failures = 0usize;
                for event in &link.links {
                    match self.events.delete_event(&event.calendar_id, &event.event_id) {
                        Ok(()) => {
                            report.events_deleted += 1;
                            gone.push(event.clone());
                        }
                        Err(err) if err.is_not_found() => gone.push(event.clone()),
                        Err(err) => {
                            failures += 1;
                            warn!(
                                "event=reconcile_event_delete module=sync status=deferred pass_id={} task_id={} event_id={} error={}",
                                report.pass_id, link.task_id, event.event_id, err
                            );
                        }
                    }
                }

                if failures == 0 {
                    Some(PendingCommit::RemoveLink(link.task_id.clone()))
                } else {
                    defer(
                        report,
                        &link.task_id,
                        format!("{failures} linked event(s) could not be deleted"),
                    );
                    Some(PendingCommit::PruneEvents(link.task_id.clone(), gone))
                }
            }
        }
    }

    fn commit(&self, pending: Vec<PendingCommit>, report: &mut ReconcileReport) {
        for commit in pending {
            match commit {
                PendingCommit::RemoveLink(task_id) => match self.links.delete(&task_id) {
                    Ok(()) => report.links_removed += 1,
                    Err(err) if err.is_not_found() => {}
                    Err(err) => defer(report, &task_id, format!("link removal failed: {err}")),
                },
                PendingCommit::PruneEvents(task_id, events) => {
                    for event in &events {
                        if let Err(err) = self.links.remove_event_link(&task_id, event) {
                            warn!(
                                "event=reconcile_prune module=sync status=deferred pass_id={} task_id={} event_id={} error={}",
                                report.pass_id, task_id, event.event_id, err
                            );
                        }
                    }
                }
            }
        }
    }
}

fn delete_event_tolerant<E: EventStore>(events: &E, event: &EventRef) -> StoreResult<()> {
    match events.delete_event(&event.calendar_id, &event.event_id) {
        Ok(()) => Ok(()),
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(err),
    }
}

fn defer(report: &mut ReconcileReport, task_id: &str, reason: String) {
    warn!(
        "event=reconcile_task module=sync status=deferred pass_id={} task_id={} reason={}",
        report.pass_id, task_id, reason
    );
    report.deferred.push(DeferredTask {
        task_id: task_id.to_string(),
        reason,
    });
}
