use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetflow::dag::JobKey;
use assetflow::exec::{CompileFuture, CompileRequest, CompileResult, Compiler};
use assetflow::types::AssetType;

/// An async compiler whose results are scripted per job.
///
/// - Each job returns its queued results in order, then `Unchanged`.
/// - Every call sleeps for `delay` (or its job's own delay) so that
///   concurrency can be observed.
/// - Calls and peak concurrency are recorded.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCompiler {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    delay: Mutex<Duration>,
    job_delays: Mutex<HashMap<JobKey, Duration>>,
    results: Mutex<HashMap<JobKey, VecDeque<CompileResult>>>,
    calls: Mutex<Vec<JobKey>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.inner.delay.lock().unwrap() = delay;
        self
    }

    /// Make every call for `(asset_type, unit)` take `delay` instead.
    pub fn with_job_delay(self, asset_type: AssetType, unit: &str, delay: Duration) -> Self {
        self.inner
            .job_delays
            .lock()
            .unwrap()
            .insert(JobKey::new(asset_type, unit), delay);
        self
    }

    /// Queue the next result for `(asset_type, unit)`.
    pub fn script(self, asset_type: AssetType, unit: &str, result: CompileResult) -> Self {
        self.inner
            .results
            .lock()
            .unwrap()
            .entry(JobKey::new(asset_type, unit))
            .or_default()
            .push_back(result);
        self
    }

    /// Jobs compiled so far, in start order.
    pub fn calls(&self) -> Vec<JobKey> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, asset_type: AssetType, unit: &str) -> usize {
        let key = JobKey::new(asset_type, unit);
        self.calls().iter().filter(|k| **k == key).count()
    }

    /// Highest number of compile calls running at the same time.
    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }
}

impl Compiler for ScriptedCompiler {
    fn compile(&self, request: CompileRequest) -> CompileFuture {
        let inner = Arc::clone(&self.inner);
        let key = request.key();

        inner.calls.lock().unwrap().push(key.clone());
        let result = inner
            .results
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|q| q.pop_front())
            .unwrap_or(CompileResult::Unchanged);
        let delay = inner
            .job_delays
            .lock()
            .unwrap()
            .get(&key)
            .copied()
            .unwrap_or_else(|| *inner.delay.lock().unwrap());

        Box::pin(async move {
            let now = inner.running.fetch_add(1, Ordering::SeqCst) + 1;
            inner.peak.fetch_max(now, Ordering::SeqCst);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            inner.running.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}
