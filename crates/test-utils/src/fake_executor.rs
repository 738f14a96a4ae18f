use std::future::Future;
use std::pin::Pin;

use assetflow::dag::JobKey;
use assetflow::engine::{CoreRuntime, CoreStep, RuntimeEvent};
use assetflow::errors::Result;
use assetflow::exec::{CompileRequest, CompileResult, ExecutorBackend};
use assetflow::types::AssetType;

/// A synchronous fake executor that:
/// - records every submitted request
/// - tracks which jobs are in flight (and the peak)
/// - never completes anything on its own; tests feed completions back into
///   the core with [`finish`].
///
/// It panics if the same job is submitted twice while in flight.
#[derive(Debug)]
pub struct FakeExecutor {
    capacity: usize,
    in_flight: Vec<JobKey>,
    submitted: Vec<CompileRequest>,
    peak: usize,
}

impl FakeExecutor {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            in_flight: Vec::new(),
            submitted: Vec::new(),
            peak: 0,
        }
    }

    /// Every request submitted so far, in order.
    pub fn submitted(&self) -> &[CompileRequest] {
        &self.submitted
    }

    /// Keys of every request submitted so far, in order.
    pub fn submitted_keys(&self) -> Vec<JobKey> {
        self.submitted.iter().map(|r| r.key()).collect()
    }

    /// Units submitted for `asset_type`, in order.
    pub fn submitted_units(&self, asset_type: AssetType) -> Vec<String> {
        self.submitted
            .iter()
            .filter(|r| r.asset_type == asset_type)
            .map(|r| r.unit.clone())
            .collect()
    }

    pub fn in_flight_keys(&self) -> &[JobKey] {
        &self.in_flight
    }

    pub fn is_in_flight(&self, key: &JobKey) -> bool {
        self.in_flight.contains(key)
    }

    /// Highest number of simultaneously in-flight jobs observed.
    pub fn peak(&self) -> usize {
        self.peak
    }
}

impl ExecutorBackend for FakeExecutor {
    fn has_capacity(&self) -> bool {
        self.in_flight.len() < self.capacity
    }

    fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn submit(&mut self, request: CompileRequest) -> Result<()> {
        let key = request.key();
        assert!(
            !self.in_flight.contains(&key),
            "job {key} submitted while already in flight"
        );
        assert!(
            self.in_flight.len() < self.capacity,
            "job {key} submitted without capacity"
        );
        self.in_flight.push(key);
        self.peak = self.peak.max(self.in_flight.len());
        self.submitted.push(request);
        Ok(())
    }

    fn release(&mut self, key: &JobKey) {
        if let Some(pos) = self.in_flight.iter().position(|k| k == key) {
            self.in_flight.remove(pos);
        }
    }

    fn abort(&mut self) {
        self.in_flight.clear();
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.in_flight.clear();
            Ok(())
        })
    }
}

/// Shorthand for a `CompileFinished` event.
pub fn finished(asset_type: AssetType, unit: &str, result: CompileResult) -> RuntimeEvent {
    RuntimeEvent::CompileFinished {
        asset_type,
        unit: unit.to_string(),
        result,
    }
}

/// Feed a completion into the core and return the resulting step.
pub fn finish(
    core: &mut CoreRuntime,
    executor: &mut FakeExecutor,
    asset_type: AssetType,
    unit: &str,
    result: CompileResult,
) -> CoreStep {
    core.step(finished(asset_type, unit, result), executor)
        .expect("core step failed")
}
