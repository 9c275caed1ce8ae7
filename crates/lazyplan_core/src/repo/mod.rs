//! Persistence implementations of the store contracts.
//!
//! # Responsibility
//! - Keep SQLite query details behind the `LinkStore` seam.
//!
//! # Invariants
//! - Repository APIs return semantic `NotFound` errors in addition to DB
//!   transport errors.

pub mod link_repo;
