// src/dag/job.rs

//! Per-(asset type, unit) job metadata and state.

use std::fmt;

use crate::dag::unit::UnitName;
use crate::types::AssetType;

/// State of a job within its tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Needs to run (never ran, or was invalidated).
    Pending,
    /// Handed to the executor; at most one instance per job.
    Processing,
    /// Finished its latest run.
    Completed,
}

/// Index of a job inside its [`JobTracker`](crate::dag::JobTracker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub(crate) usize);

impl JobId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identifies a job across trackers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobKey {
    pub asset_type: AssetType,
    pub unit: UnitName,
}

impl JobKey {
    pub fn new(asset_type: AssetType, unit: impl Into<UnitName>) -> Self {
        Self {
            asset_type,
            unit: unit.into(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.asset_type, self.unit)
    }
}

/// A job plus its edges inside the tracker (indices into the same tracker).
#[derive(Debug, Clone)]
pub(crate) struct Job {
    pub unit: UnitName,
    pub unit_index: usize,
    pub deps: Vec<usize>,
    pub dependents: Vec<usize>,
    pub state: JobState,
    /// Set once the job finished for the first time in this run.
    pub completed_once: bool,
    /// Invalidated while `Processing`; applied when the run completes.
    pub dirty: bool,
}
