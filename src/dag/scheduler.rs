use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::dag::graph::TypeGraph;
use crate::dag::job::JobId;
use crate::dag::tick::Tick;
use crate::dag::tracker::{Completion, JobTracker};
use crate::dag::unit::UnitRegistry;
use crate::engine::RunOptions;
use crate::errors::Result;
use crate::exec::{CompileRequest, ExecutorBackend};
use crate::types::AssetType;

/// Scheduler holds the immutable unit registry plus one job tracker per
/// active asset type.
///
/// It is responsible for:
/// - pulling ready jobs in asset-type priority order
/// - respecting the executor's capacity (backing off when it is full)
/// - routing completions and invalidations to the right tracker
/// - building compile requests for the executor
#[derive(Debug)]
pub struct Scheduler {
    registry: UnitRegistry,
    /// Trackers in priority order.
    trackers: Vec<JobTracker>,
    root_dir: PathBuf,
    production: bool,
    verbose: bool,
}

impl Scheduler {
    /// Project the registry onto every asset type active under `options`.
    ///
    /// In production mode the test-only asset type gets no tracker at all.
    pub fn new(registry: UnitRegistry, options: &RunOptions, root_dir: impl Into<PathBuf>) -> Self {
        let trackers: Vec<JobTracker> = AssetType::active(options.production)
            .map(|t| JobTracker::new(&TypeGraph::project(&registry, t)))
            .collect();

        for tracker in &trackers {
            debug!(
                asset_type = %tracker.asset_type(),
                jobs = tracker.len(),
                "job tracker created"
            );
        }

        Self {
            registry,
            trackers,
            root_dir: root_dir.into(),
            production: options.production,
            verbose: options.verbose,
        }
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Tracker for `asset_type`, if that type is active in this run.
    pub fn tracker(&self, asset_type: AssetType) -> Option<&JobTracker> {
        self.trackers.iter().find(|t| t.asset_type() == asset_type)
    }

    fn tracker_mut(&mut self, asset_type: AssetType) -> Option<&mut JobTracker> {
        self.trackers.iter_mut().find(|t| t.asset_type() == asset_type)
    }

    /// Active asset types in priority order.
    pub fn asset_types(&self) -> impl Iterator<Item = AssetType> + '_ {
        self.trackers.iter().map(|t| t.asset_type())
    }

    /// Jobs in flight across every tracker.
    pub fn in_flight(&self) -> usize {
        self.trackers.iter().map(|t| t.in_flight()).sum()
    }

    /// No job is pending or in flight in any tracker.
    pub fn is_quiescent(&self) -> bool {
        self.trackers.iter().all(|t| t.is_quiescent())
    }

    /// Assets directory of a unit (used for watch registration).
    pub fn assets_dir_of(&self, unit: &str) -> Option<&Path> {
        self.registry.get(unit).map(|u| u.assets_dir())
    }

    /// Drain ready jobs into the executor.
    ///
    /// Each pass walks the trackers in priority order and submits at most one
    /// ready job per tracker. Passes repeat while they keep submitting. If the
    /// executor is full when a tracker has a ready job, the tick stops right
    /// there without looking at lower-priority trackers.
    pub fn tick<E>(&mut self, executor: &mut E) -> Result<Tick>
    where
        E: ExecutorBackend + ?Sized,
    {
        let mut tick = Tick::default();

        loop {
            let mut submitted_this_pass = false;

            for slot in 0..self.trackers.len() {
                let Some(job) = self.trackers[slot].next_ready_job() else {
                    continue;
                };

                if !executor.has_capacity() {
                    debug!(
                        asset_type = %self.trackers[slot].asset_type(),
                        unit = %self.trackers[slot].unit_name(job),
                        in_flight = executor.in_flight(),
                        pending = self.trackers[slot].pending(),
                        "executor at capacity; backing off"
                    );
                    tick.backoff = true;
                    return Ok(tick);
                }

                let request = self.build_request(slot, job);
                let key = request.key();

                self.trackers[slot].mark_processing(job);
                info!(
                    asset_type = %key.asset_type,
                    unit = %key.unit,
                    "scheduling compile step"
                );
                executor.submit(request)?;

                tick.dispatched.push(key);
                submitted_this_pass = true;
            }

            if !submitted_this_pass {
                break;
            }
        }

        tick.quiescent = self.is_quiescent();
        Ok(tick)
    }

    /// Record a finished compile step.
    ///
    /// Returns `None` (and logs) if the job is unknown to this scheduler.
    pub fn complete(&mut self, asset_type: AssetType, unit: &str, changed: bool) -> Option<Completion> {
        let Some(tracker) = self.tracker_mut(asset_type) else {
            warn!(asset_type = %asset_type, unit = %unit, "completion for inactive asset type; ignoring");
            return None;
        };
        let Some(job) = tracker.job_id(unit) else {
            warn!(asset_type = %asset_type, unit = %unit, "completion for unknown job; ignoring");
            return None;
        };
        Some(tracker.mark_completed(job, changed))
    }

    /// Invalidate a job because its sources changed.
    ///
    /// Returns `false` if the job is unknown to this scheduler.
    pub fn mark_dirty(&mut self, asset_type: AssetType, unit: &str) -> bool {
        let Some(tracker) = self.tracker_mut(asset_type) else {
            return false;
        };
        match tracker.job_id(unit) {
            Some(job) => {
                tracker.mark_dirty(job);
                true
            }
            None => false,
        }
    }

    fn build_request(&self, slot: usize, job: JobId) -> CompileRequest {
        let tracker = &self.trackers[slot];
        let unit = self.registry.unit_at(tracker.unit_index(job));

        CompileRequest {
            unit: unit.name().to_string(),
            asset_type: tracker.asset_type(),
            unit_dir: unit.dir().to_path_buf(),
            assets_dir: unit.assets_dir().to_path_buf(),
            dependency_paths: self.registry.dependency_paths(unit),
            root_dir: self.root_dir.clone(),
            production: self.production,
            verbose: self.verbose,
        }
    }
}
