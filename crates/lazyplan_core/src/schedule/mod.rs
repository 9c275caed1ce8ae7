//! Deterministic scheduling logic.
//!
//! # Responsibility
//! - Interval set algebra over absolute instants (`interval`).
//! - Schedule line parsing into zone-correct event specs (`parser`).
//! - Free-window resolution against an Event Store (`availability`).
//! - Weekly time-by-category statistics (`stats`).
//!
//! # Invariants
//! - `interval` and `parser` are pure; "now" is always injected.

pub mod availability;
pub mod interval;
pub mod parser;
pub mod stats;
