//! Scheduling core for LazyPlan.
//!
//! Parses natural schedule lines into calendar events, computes free time
//! from busy intervals, and keeps tasks and their calendar events in step.
//! Remote calendar/task services plug in through the traits in [`store`].

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;
pub mod store;

pub use config::{load_config, parse_config, ConfigError, PlannerConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::event::{EventBody, EventSpec, RecurrenceRule, Weekday};
pub use model::link::{EventRef, TaskEventLink};
pub use model::task::{TaskRecord, TaskStatus};
pub use model::window::{TimeWindow, WindowError};
pub use repo::link_repo::SqliteLinkStore;
pub use schedule::availability::AvailabilityResolver;
pub use schedule::interval::{complement, normalize, BusySet};
pub use schedule::parser::{BatchParse, LineFailure, ParseError, ScheduleLineParser};
pub use service::sync_service::{
    CreateLinkError, LinkState, LinkedCreation, ReconcileError, ReconcileReport,
    TaskEventSynchronizer,
};
pub use store::{EventStore, LinkStore, ListedEvent, StoreError, StoreResult, TaskStore};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
