//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate Task, Event and Link stores into use-case level APIs.
//! - Keep callers decoupled from adapter and storage details.

pub mod sync_service;
