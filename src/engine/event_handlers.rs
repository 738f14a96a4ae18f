// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::dag::{JobKey, Scheduler, UnitName};
use crate::engine::{RunOptions, RunOutcome};
use crate::errors::Result;
use crate::exec::{CompileResult, ExecutorBackend};
use crate::types::AssetType;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start watching a unit's sources for one asset type.
    RegisterWatch {
        asset_type: AssetType,
        unit: UnitName,
        assets_dir: PathBuf,
    },
    /// Close a single watch (it failed after establishment).
    CloseWatch { asset_type: AssetType, unit: UnitName },
    /// Watch mode reached quiescence; everything is up to date.
    AnnounceIdle,
    /// The run is over.
    Finish(RunOutcome),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn finished(mut commands: Vec<CoreCommand>, outcome: RunOutcome) -> Self {
        commands.push(CoreCommand::Finish(outcome));
        Self {
            commands,
            keep_running: false,
        }
    }
}

/// Bookkeeping the core keeps across events.
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    /// A `Finish` command was issued; later events are ignored.
    pub finished: bool,
    /// `AnnounceIdle` was issued and nothing was dispatched since.
    pub idle_announced: bool,
    /// Compile results consumed so far.
    pub compiled: usize,
    /// Failed compile results consumed so far.
    pub failed: usize,
}

/// Tick the scheduler and translate quiescence into idle/finish commands.
pub fn drive<E>(
    scheduler: &mut Scheduler,
    options: &RunOptions,
    progress: &mut RunProgress,
    executor: &mut E,
    mut commands: Vec<CoreCommand>,
) -> Result<CoreStep>
where
    E: ExecutorBackend + ?Sized,
{
    let tick = scheduler.tick(executor)?;

    if !tick.dispatched.is_empty() {
        progress.idle_announced = false;
    }

    if !tick.quiescent {
        return Ok(CoreStep::running(commands));
    }

    if options.watch {
        if !progress.idle_announced {
            progress.idle_announced = true;
            info!(
                compiled = progress.compiled,
                failed = progress.failed,
                "compilation completed; watching files"
            );
            commands.push(CoreCommand::AnnounceIdle);
        }
        return Ok(CoreStep::running(commands));
    }

    progress.finished = true;
    info!(compiled = progress.compiled, "compilation completed");
    Ok(CoreStep::finished(commands, RunOutcome::Success))
}

/// Handle a compile completion.
///
/// The executor slot is always released first, even when the run is already
/// over and the result is discarded.
pub fn handle_compile_finished<E>(
    scheduler: &mut Scheduler,
    options: &RunOptions,
    progress: &mut RunProgress,
    executor: &mut E,
    asset_type: AssetType,
    unit: UnitName,
    result: CompileResult,
) -> Result<CoreStep>
where
    E: ExecutorBackend + ?Sized,
{
    let key = JobKey::new(asset_type, unit);
    executor.release(&key);

    if progress.finished {
        debug!(job = %key, ?result, "run already finished; discarding compile result");
        return Ok(CoreStep::running(Vec::new()));
    }

    progress.compiled += 1;
    let changed = result.invalidates_dependents();
    let Some(completion) = scheduler.complete(asset_type, &key.unit, changed) else {
        return drive(scheduler, options, progress, executor, Vec::new());
    };

    if !completion.invalidated.is_empty() {
        debug!(
            job = %key,
            invalidated = ?completion.invalidated,
            "dependents scheduled for rebuild"
        );
    }

    let mut commands = Vec::new();
    if completion.first_completion && options.watch {
        match scheduler.assets_dir_of(&key.unit) {
            Some(assets_dir) => commands.push(CoreCommand::RegisterWatch {
                asset_type,
                unit: key.unit.clone(),
                assets_dir: assets_dir.to_path_buf(),
            }),
            None => warn!(job = %key, "no assets directory for completed unit"),
        }
    }

    if let CompileResult::Failed(detail) = result {
        progress.failed += 1;

        if !options.watch {
            error!(job = %key, %detail, "compilation failed; stopping");
            progress.finished = true;
            return Ok(CoreStep::finished(
                commands,
                RunOutcome::Failed {
                    unit: key.unit,
                    asset_type,
                    detail,
                },
            ));
        }

        error!(job = %key, %detail, "compilation failed; waiting for changes");
    }

    drive(scheduler, options, progress, executor, commands)
}

/// Handle a debounced source change for a watched job.
pub fn handle_source_changed<E>(
    scheduler: &mut Scheduler,
    options: &RunOptions,
    progress: &mut RunProgress,
    executor: &mut E,
    asset_type: AssetType,
    unit: UnitName,
) -> Result<CoreStep>
where
    E: ExecutorBackend + ?Sized,
{
    if progress.finished {
        return Ok(CoreStep::running(Vec::new()));
    }

    if !scheduler.mark_dirty(asset_type, &unit) {
        warn!(asset_type = %asset_type, unit = %unit, "source change for unknown job; ignoring");
        return Ok(CoreStep::running(Vec::new()));
    }

    info!(asset_type = %asset_type, unit = %unit, "sources changed; recompiling");
    drive(scheduler, options, progress, executor, Vec::new())
}

/// Handle a watch failure: report it and close only that watch.
pub fn handle_watch_failed(asset_type: AssetType, unit: UnitName, error: String) -> CoreStep {
    error!(asset_type = %asset_type, unit = %unit, %error, "watcher failed; closing it");
    CoreStep::running(vec![CoreCommand::CloseWatch { asset_type, unit }])
}
