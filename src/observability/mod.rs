//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured `tracing` events with named fields (`hostname`, `path`,
//!   `scheme`, `network`) across the crate
//! - The library only emits events; installing a subscriber is left to the
//!   binary or the embedding application

pub mod logging;
