// src/dag/tracker.rs

//! Job state machine for one asset type.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::dag::graph::TypeGraph;
use crate::dag::job::{Job, JobId, JobState};
use crate::dag::unit::UnitName;
use crate::types::AssetType;

/// Result of [`JobTracker::mark_completed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// First completion of this job in the run (gates watch registration).
    pub first_completion: bool,
    /// The job was dirtied while processing and is `Pending` again.
    pub requeued: bool,
    /// Dependents demoted from `Completed` to `Pending` by this completion.
    pub invalidated: Vec<UnitName>,
}

/// Owns the state of every job in one asset type's graph.
///
/// All transitions go through this type:
/// - `mark_processing`: `Pending -> Processing`
/// - `mark_completed`: `Processing -> Completed` (or `Pending` if dirtied),
///   cascading to completed dependents when the output changed
/// - `mark_dirty`: anything `-> Pending`, deferred while processing
///
/// Calling a transition from the wrong state is a programming error and
/// panics.
#[derive(Debug, Clone)]
pub struct JobTracker {
    asset_type: AssetType,
    jobs: Vec<Job>,
    index: HashMap<UnitName, usize>,
}

impl JobTracker {
    /// Create a tracker with one `Pending` job per graph node.
    pub fn new(graph: &TypeGraph) -> Self {
        let mut jobs = Vec::with_capacity(graph.len());
        let mut index = HashMap::with_capacity(graph.len());

        for node in 0..graph.len() {
            let unit = graph.unit_name(node).to_string();
            index.insert(unit.clone(), node);
            jobs.push(Job {
                unit,
                unit_index: graph.unit_index(node),
                deps: graph.dependencies_of(node).to_vec(),
                dependents: graph.dependents_of(node).to_vec(),
                state: JobState::Pending,
                completed_once: false,
                dirty: false,
            });
        }

        Self {
            asset_type: graph.asset_type(),
            jobs,
            index,
        }
    }

    pub fn asset_type(&self) -> AssetType {
        self.asset_type
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job_id(&self, unit: &str) -> Option<JobId> {
        self.index.get(unit).copied().map(JobId)
    }

    pub fn unit_name(&self, job: JobId) -> &str {
        &self.jobs[job.0].unit
    }

    /// Registry index of the unit owning `job`.
    pub fn unit_index(&self, job: JobId) -> usize {
        self.jobs[job.0].unit_index
    }

    pub fn state(&self, job: JobId) -> JobState {
        self.jobs[job.0].state
    }

    pub fn state_of(&self, unit: &str) -> Option<JobState> {
        self.job_id(unit).map(|id| self.state(id))
    }

    pub fn has_completed_once(&self, unit: &str) -> bool {
        self.job_id(unit)
            .map(|id| self.jobs[id.0].completed_once)
            .unwrap_or(false)
    }

    /// Dependency job ids of `job`.
    pub fn dependencies(&self, job: JobId) -> impl Iterator<Item = JobId> + '_ {
        self.jobs[job.0].deps.iter().map(|&d| JobId(d))
    }

    /// One `Pending` job whose dependencies are all `Completed`.
    ///
    /// Ties are broken by graph order, so repeated calls without an
    /// intervening transition return the same job.
    pub fn next_ready_job(&self) -> Option<JobId> {
        (0..self.jobs.len()).find(|&i| self.is_ready(i)).map(JobId)
    }

    /// Every job that [`next_ready_job`](Self::next_ready_job) could return.
    pub fn ready_jobs(&self) -> Vec<JobId> {
        (0..self.jobs.len())
            .filter(|&i| self.is_ready(i))
            .map(JobId)
            .collect()
    }

    fn is_ready(&self, i: usize) -> bool {
        let job = &self.jobs[i];
        job.state == JobState::Pending
            && job
                .deps
                .iter()
                .all(|&d| self.jobs[d].state == JobState::Completed)
    }

    /// `Pending -> Processing`.
    ///
    /// # Panics
    ///
    /// If the job is not `Pending`: a second in-flight instance of the same
    /// job must never be started.
    pub fn mark_processing(&mut self, job: JobId) {
        let asset_type = self.asset_type;
        let entry = &mut self.jobs[job.0];
        if entry.state != JobState::Pending {
            panic!(
                "{asset_type} job '{}' marked processing while {:?}",
                entry.unit, entry.state
            );
        }
        entry.state = JobState::Processing;
        trace!(asset_type = %asset_type, unit = %entry.unit, "job processing");
    }

    /// `Processing -> Completed`.
    ///
    /// When `changed` is true, dependents currently `Completed` go back to
    /// `Pending`; dependents already `Pending` or `Processing` are left alone.
    /// A job dirtied while processing lands in `Pending` instead of
    /// `Completed`.
    ///
    /// # Panics
    ///
    /// If the job is not `Processing`.
    pub fn mark_completed(&mut self, job: JobId, changed: bool) -> Completion {
        let asset_type = self.asset_type;
        let entry = &mut self.jobs[job.0];
        if entry.state != JobState::Processing {
            panic!(
                "{asset_type} job '{}' marked completed while {:?}",
                entry.unit, entry.state
            );
        }

        let first_completion = !entry.completed_once;
        entry.completed_once = true;

        let requeued = entry.dirty;
        entry.dirty = false;
        entry.state = if requeued {
            JobState::Pending
        } else {
            JobState::Completed
        };

        debug!(
            asset_type = %asset_type,
            unit = %entry.unit,
            changed,
            first_completion,
            requeued,
            "job completed"
        );

        let mut invalidated = Vec::new();
        if changed {
            let dependents = entry.dependents.clone();
            for d in dependents {
                let dependent = &mut self.jobs[d];
                if dependent.state == JobState::Completed {
                    dependent.state = JobState::Pending;
                    debug!(
                        asset_type = %asset_type,
                        unit = %dependent.unit,
                        "dependency output changed; dependent Pending again"
                    );
                    invalidated.push(dependent.unit.clone());
                }
            }
        }

        Completion {
            first_completion,
            requeued,
            invalidated,
        }
    }

    /// Invalidate a job after its sources changed.
    ///
    /// A processing job keeps running; the invalidation is applied by its
    /// completion.
    pub fn mark_dirty(&mut self, job: JobId) {
        let asset_type = self.asset_type;
        let entry = &mut self.jobs[job.0];
        match entry.state {
            JobState::Processing => {
                entry.dirty = true;
                debug!(
                    asset_type = %asset_type,
                    unit = %entry.unit,
                    "job dirtied while processing; re-run after completion"
                );
            }
            JobState::Completed => {
                entry.state = JobState::Pending;
                debug!(asset_type = %asset_type, unit = %entry.unit, "job dirtied");
            }
            JobState::Pending => {}
        }
    }

    /// Number of jobs currently `Processing`.
    pub fn in_flight(&self) -> usize {
        self.count(JobState::Processing)
    }

    /// Number of jobs currently `Pending`.
    pub fn pending(&self) -> usize {
        self.count(JobState::Pending)
    }

    fn count(&self, state: JobState) -> usize {
        self.jobs.iter().filter(|j| j.state == state).count()
    }

    /// No job is `Pending` or `Processing`.
    pub fn is_quiescent(&self) -> bool {
        self.jobs.iter().all(|j| j.state == JobState::Completed)
    }
}
