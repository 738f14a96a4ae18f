// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The scheduler talks to an `ExecutorBackend` instead of spawning work
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production pool here.
//!
//! - `WorkerPool` is the implementation used by the binary. It runs a
//!   [`Compiler`] on Tokio tasks and posts every result back to the control
//!   loop as a `RuntimeEvent::CompileFinished`.
//! - Tests can provide their own backend that records submissions and lets
//!   the test decide when and how each job finishes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::dag::JobKey;
use crate::engine::RuntimeEvent;
use crate::errors::{AssetflowError, Result};
use crate::exec::command::Compiler;
use crate::exec::request::CompileRequest;

/// Capacity-bounded executor contract.
///
/// `submit` is only called after `has_capacity` returned true, and must
/// accept the request (no queueing, no rejection). The control loop calls
/// `release` once it has consumed the matching result.
pub trait ExecutorBackend: Send {
    /// Whether one more request can be submitted right now.
    fn has_capacity(&self) -> bool;

    /// Requests submitted and not yet released.
    fn in_flight(&self) -> usize;

    /// Start a compile step. The result arrives later as a runtime event.
    fn submit(&mut self, request: CompileRequest) -> Result<()>;

    /// Free the slot held by `key`.
    fn release(&mut self, key: &JobKey);

    /// Cancel in-flight work without waiting for it; results are never
    /// delivered.
    fn abort(&mut self);

    /// Wait for in-flight work to settle and release resources.
    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Tokio worker pool with a fixed maximum of concurrent compile steps.
pub struct WorkerPool {
    compiler: Arc<dyn Compiler>,
    max_parallelism: usize,
    in_flight: usize,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    workers: JoinSet<()>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("max_parallelism", &self.max_parallelism)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Create a pool; a `max_parallelism` of zero is treated as one.
    pub fn new(
        compiler: Arc<dyn Compiler>,
        max_parallelism: usize,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self {
        Self {
            compiler,
            max_parallelism: max_parallelism.max(1),
            in_flight: 0,
            runtime_tx,
            workers: JoinSet::new(),
        }
    }

    /// Drop bookkeeping for workers that already finished.
    fn reap_finished(&mut self) {
        while let Some(res) = self.workers.try_join_next() {
            if let Err(err) = res {
                warn!(error = %err, "compile worker terminated abnormally");
            }
        }
    }
}

impl ExecutorBackend for WorkerPool {
    fn has_capacity(&self) -> bool {
        self.in_flight < self.max_parallelism
    }

    fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn submit(&mut self, request: CompileRequest) -> Result<()> {
        if !self.has_capacity() {
            return Err(AssetflowError::Executor(format!(
                "worker pool is full ({} in flight); refusing {}",
                self.in_flight,
                request.key()
            )));
        }

        self.reap_finished();
        self.in_flight += 1;

        let key = request.key();
        let compile = self.compiler.compile(request);
        let tx = self.runtime_tx.clone();

        self.workers.spawn(async move {
            let result = compile.await;
            debug!(job = %key, ?result, "compile step finished");

            let event = RuntimeEvent::CompileFinished {
                asset_type: key.asset_type,
                unit: key.unit,
                result,
            };
            if tx.send(event).await.is_err() {
                debug!("runtime stopped; discarding compile result");
            }
        });

        Ok(())
    }

    fn release(&mut self, key: &JobKey) {
        if self.in_flight == 0 {
            warn!(job = %key, "release without a matching submit; ignoring");
            return;
        }
        self.in_flight -= 1;
    }

    fn abort(&mut self) {
        if !self.workers.is_empty() {
            debug!(workers = self.workers.len(), "cancelling in-flight compile steps");
        }
        // Dropping a cancelled worker kills its compiler process.
        self.workers.abort_all();
        self.in_flight = 0;
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            if !self.workers.is_empty() {
                debug!(
                    workers = self.workers.len(),
                    "waiting for in-flight compile steps to settle"
                );
            }
            while let Some(res) = self.workers.join_next().await {
                if let Err(err) = res {
                    warn!(error = %err, "compile worker terminated abnormally");
                }
            }
            self.in_flight = 0;
            Ok(())
        })
    }
}
