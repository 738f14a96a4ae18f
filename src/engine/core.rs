// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated scheduler state
//! - a list of "commands" describing what the IO shell should do next
//!
//! Submissions go straight to the executor backend passed into each call;
//! the backend's `submit` is synchronous, so tests can drive the core with a
//! fake executor and inject completions by hand without Tokio, channels,
//! filesystem, or processes.

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    drive, handle_compile_finished, handle_source_changed, handle_watch_failed, CoreStep,
    RunProgress,
};
use crate::engine::{RunOptions, RunOutcome, RuntimeEvent};
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::CoreCommand;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    options: RunOptions,
    progress: RunProgress,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler, options: RunOptions) -> Self {
        Self {
            scheduler,
            options,
            progress: RunProgress::default(),
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Whether a `Finish` command was already issued.
    pub fn is_finished(&self) -> bool {
        self.progress.finished
    }

    /// Dispatch the initial wave of ready jobs.
    pub fn start<E>(&mut self, executor: &mut E) -> Result<CoreStep>
    where
        E: ExecutorBackend + ?Sized,
    {
        drive(
            &mut self.scheduler,
            &self.options,
            &mut self.progress,
            executor,
            Vec::new(),
        )
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step<E>(&mut self, event: RuntimeEvent, executor: &mut E) -> Result<CoreStep>
    where
        E: ExecutorBackend + ?Sized,
    {
        match event {
            RuntimeEvent::CompileFinished {
                asset_type,
                unit,
                result,
            } => handle_compile_finished(
                &mut self.scheduler,
                &self.options,
                &mut self.progress,
                executor,
                asset_type,
                unit,
                result,
            ),
            RuntimeEvent::SourceChanged { asset_type, unit } => handle_source_changed(
                &mut self.scheduler,
                &self.options,
                &mut self.progress,
                executor,
                asset_type,
                unit,
            ),
            RuntimeEvent::WatchFailed {
                asset_type,
                unit,
                error,
            } => Ok(handle_watch_failed(asset_type, unit, error)),
            RuntimeEvent::ShutdownRequested => Ok(self.stop()),
        }
    }

    /// Stop the run; later events are ignored.
    pub fn stop(&mut self) -> CoreStep {
        self.progress.finished = true;
        CoreStep {
            commands: vec![CoreCommand::Finish(RunOutcome::Stopped)],
            keep_running: false,
        }
    }
}
