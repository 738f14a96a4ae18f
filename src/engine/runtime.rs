// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::JobKey;
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::watch::WatchRegistry;

use super::core::CoreRuntime;
use super::{CoreCommand, RunOutcome, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from
/// channels, owning the watches, and draining the executor on exit.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    watches: WatchRegistry,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("watches", &self.watches.len())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        core: CoreRuntime,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        watches: WatchRegistry,
    ) -> Self {
        Self {
            core,
            event_rx,
            executor,
            watches,
        }
    }

    /// Main event loop.
    ///
    /// - Dispatches the initial wave of ready jobs.
    /// - Consumes `RuntimeEvent`s from `event_rx` and feeds them into the core.
    /// - Executes commands returned by the core (watch, idle, finish).
    /// - On exit closes every watch. In-flight compile steps are awaited after
    ///   success or a stop, and cancelled after a failure.
    pub async fn run(self) -> Result<RunOutcome> {
        let Self {
            mut core,
            mut event_rx,
            mut executor,
            mut watches,
        } = self;

        info!(
            watch = core.options().watch,
            production = core.options().production,
            "assetflow runtime started"
        );

        let result = event_loop(&mut core, &mut event_rx, &mut executor, &mut watches).await;

        watches.close_all();
        // Workers still running see a closed channel and discard their results.
        drop(event_rx);
        match &result {
            Ok(RunOutcome::Success | RunOutcome::Stopped) => executor.shutdown().await?,
            // A failed run reports right away; unrelated steps are cancelled.
            Ok(RunOutcome::Failed { .. }) | Err(_) => executor.abort(),
        }

        info!("runtime exiting");
        result
    }
}

async fn event_loop<E: ExecutorBackend>(
    core: &mut CoreRuntime,
    event_rx: &mut mpsc::Receiver<RuntimeEvent>,
    executor: &mut E,
    watches: &mut WatchRegistry,
) -> Result<RunOutcome> {
    let mut outcome = None;

    let step = core.start(executor)?;
    for command in step.commands {
        execute_command(command, watches, &mut outcome);
    }
    if !step.keep_running {
        return Ok(outcome.unwrap_or(RunOutcome::Stopped));
    }

    loop {
        let event = match event_rx.recv().await {
            Some(e) => e,
            None => {
                info!("runtime event channel closed; exiting");
                break;
            }
        };

        debug!(?event, "runtime received event");

        // Feed the event into the pure core and get commands back.
        let step = core.step(event, executor)?;

        for command in step.commands {
            execute_command(command, watches, &mut outcome);
        }

        if !step.keep_running {
            info!("core requested exit; stopping runtime");
            break;
        }
    }

    Ok(outcome.unwrap_or(RunOutcome::Stopped))
}

/// Execute a single command from the core.
fn execute_command(
    command: CoreCommand,
    watches: &mut WatchRegistry,
    outcome: &mut Option<RunOutcome>,
) {
    match command {
        CoreCommand::RegisterWatch {
            asset_type,
            unit,
            assets_dir,
        } => {
            let key = JobKey::new(asset_type, unit);
            if let Err(err) = watches.register(key.clone(), &assets_dir) {
                warn!(job = %key, error = %format!("{err:#}"), "could not establish watch");
            }
        }
        CoreCommand::CloseWatch { asset_type, unit } => {
            watches.close(&JobKey::new(asset_type, unit));
        }
        CoreCommand::AnnounceIdle => {
            debug!(watches = watches.len(), "idle");
        }
        CoreCommand::Finish(result) => {
            *outcome = Some(result);
        }
    }
}
