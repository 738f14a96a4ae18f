// src/dag/mod.rs

//! Unit graph representation and scheduling.
//!
//! - [`unit`] resolves discovered units into a registry.
//! - [`graph`] projects the registry onto a single asset type.
//! - [`tracker`] owns the per-type job state machine.
//! - [`scheduler`] drains ready jobs into the executor in priority order.
//! - [`tick`] defines the result type of a scheduler tick.

pub mod graph;
pub mod job;
pub mod scheduler;
pub mod tick;
pub mod tracker;
pub mod unit;

pub use graph::TypeGraph;
pub use job::{JobId, JobKey, JobState};
pub use scheduler::Scheduler;
pub use tick::Tick;
pub use tracker::{Completion, JobTracker};
pub use unit::{DiscoveredUnit, Unit, UnitName, UnitRegistry};
