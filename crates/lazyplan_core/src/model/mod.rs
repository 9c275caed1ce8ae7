//! Domain model for scheduling, tasks and task/event links.
//!
//! # Responsibility
//! - Define value objects shared by the parser, interval algebra and
//!   synchronizer.
//! - Keep wire rendering (RFC 3339 offsets, RRULE text) next to the types.
//!
//! # Invariants
//! - Every `TimeWindow` satisfies `start <= end` and compares on UTC instants.
//! - `EventSpec` start is strictly before end.

pub mod event;
pub mod link;
pub mod task;
pub mod window;
