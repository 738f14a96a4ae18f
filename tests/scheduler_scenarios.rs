// tests/scheduler_scenarios.rs

use std::path::PathBuf;

use assetflow::dag::{JobKey, JobState, Scheduler, UnitRegistry};
use assetflow::engine::{CoreCommand, CoreRuntime, RunOptions, RunOutcome, RuntimeEvent};
use assetflow::exec::{CompileResult, ExecutorBackend};
use assetflow::types::AssetType;
use assetflow_test_utils::{finish, init_tracing, FakeExecutor, RegistryBuilder};

use AssetType::{CompressCss, Less, TypeScript as Ts, TypeScriptE2e as E2e};
use CompileResult::{Changed, Unchanged};

const BATCH: RunOptions = RunOptions {
    watch: false,
    production: false,
    verbose: false,
};

const WATCH: RunOptions = RunOptions {
    watch: true,
    production: false,
    verbose: false,
};

fn core(registry: UnitRegistry, options: RunOptions) -> CoreRuntime {
    CoreRuntime::new(Scheduler::new(registry, &options, "/repo"), options)
}

/// x <- y <- z, ts only.
fn chain() -> UnitRegistry {
    RegistryBuilder::new()
        .unit("x", &[Ts], &[])
        .unit("y", &[Ts], &["x"])
        .unit("z", &[Ts], &["y"])
        .build()
}

fn key(asset_type: AssetType, unit: &str) -> JobKey {
    JobKey::new(asset_type, unit)
}

fn state(core: &CoreRuntime, asset_type: AssetType, unit: &str) -> JobState {
    core.scheduler()
        .tracker(asset_type)
        .and_then(|t| t.state_of(unit))
        .expect("job exists")
}

fn has_finish(commands: &[CoreCommand], outcome: &RunOutcome) -> bool {
    commands
        .iter()
        .any(|c| matches!(c, CoreCommand::Finish(o) if o == outcome))
}

#[test]
fn batch_chain_runs_in_dependency_order_and_succeeds() {
    init_tracing();
    let mut core = core(chain(), BATCH);
    let mut exec = FakeExecutor::new(4);

    let step = core.start(&mut exec).unwrap();
    assert!(step.keep_running);
    assert_eq!(exec.submitted_units(Ts), ["x"]);

    let step = finish(&mut core, &mut exec, Ts, "x", Unchanged);
    assert!(step.keep_running);
    assert_eq!(exec.submitted_units(Ts), ["x", "y"]);

    finish(&mut core, &mut exec, Ts, "y", Unchanged);
    assert_eq!(exec.submitted_units(Ts), ["x", "y", "z"]);

    let step = finish(&mut core, &mut exec, Ts, "z", Unchanged);
    assert!(!step.keep_running);
    assert!(has_finish(&step.commands, &RunOutcome::Success));
    assert!(core.is_finished());
    assert_eq!(exec.in_flight(), 0);
}

#[test]
fn changed_output_reschedules_completed_dependents_and_cascades() {
    init_tracing();
    let mut core = core(chain(), WATCH);
    let mut exec = FakeExecutor::new(4);

    core.start(&mut exec).unwrap();
    finish(&mut core, &mut exec, Ts, "x", Unchanged);
    finish(&mut core, &mut exec, Ts, "y", Unchanged);
    let step = finish(&mut core, &mut exec, Ts, "z", Unchanged);
    assert!(step.commands.contains(&CoreCommand::AnnounceIdle));

    // x's sources change and it now produces different output.
    core.step(
        RuntimeEvent::SourceChanged {
            asset_type: Ts,
            unit: "x".into(),
        },
        &mut exec,
    )
    .unwrap();
    assert!(exec.is_in_flight(&key(Ts, "x")));
    assert_eq!(state(&core, Ts, "y"), JobState::Completed);

    finish(&mut core, &mut exec, Ts, "x", Changed);
    assert!(exec.is_in_flight(&key(Ts, "y")));
    // z only cascades once y reports a change.
    assert_eq!(state(&core, Ts, "z"), JobState::Completed);

    finish(&mut core, &mut exec, Ts, "y", Changed);
    assert!(exec.is_in_flight(&key(Ts, "z")));

    let step = finish(&mut core, &mut exec, Ts, "z", Unchanged);
    assert!(step.commands.contains(&CoreCommand::AnnounceIdle));
    assert_eq!(exec.submitted_units(Ts), ["x", "y", "z", "x", "y", "z"]);
}

#[test]
fn unchanged_output_does_not_reschedule_dependents() {
    let mut core = core(chain(), WATCH);
    let mut exec = FakeExecutor::new(4);

    core.start(&mut exec).unwrap();
    for unit in ["x", "y", "z"] {
        finish(&mut core, &mut exec, Ts, unit, Unchanged);
    }

    core.step(
        RuntimeEvent::SourceChanged {
            asset_type: Ts,
            unit: "x".into(),
        },
        &mut exec,
    )
    .unwrap();
    let step = finish(&mut core, &mut exec, Ts, "x", Unchanged);

    assert_eq!(exec.submitted_units(Ts), ["x", "y", "z", "x"]);
    assert!(step.commands.contains(&CoreCommand::AnnounceIdle));
}

#[test]
fn batch_failure_stops_without_waiting_for_independent_jobs() {
    init_tracing();
    let registry = RegistryBuilder::new()
        .unit("y", &[Ts], &[])
        .unit("w", &[Ts], &[])
        .unit("after_y", &[Ts], &["y"])
        .build();
    let mut core = core(registry, BATCH);
    let mut exec = FakeExecutor::new(2);

    core.start(&mut exec).unwrap();
    assert_eq!(exec.submitted_units(Ts), ["y", "w"]);

    let step = finish(
        &mut core,
        &mut exec,
        Ts,
        "y",
        CompileResult::Failed("syntax error".into()),
    );
    assert!(!step.keep_running);
    assert!(has_finish(
        &step.commands,
        &RunOutcome::Failed {
            unit: "y".into(),
            asset_type: Ts,
            detail: "syntax error".into(),
        }
    ));
    // w is still in flight; nothing new was scheduled.
    assert!(exec.is_in_flight(&key(Ts, "w")));
    assert_eq!(exec.submitted().len(), 2);

    // A straggler completion is released and otherwise ignored.
    let step = finish(&mut core, &mut exec, Ts, "w", Unchanged);
    assert!(step.commands.is_empty());
    assert_eq!(exec.in_flight(), 0);
    assert_eq!(exec.submitted().len(), 2);
}

#[test]
fn watch_mode_failure_is_treated_as_changed_and_continues() {
    let mut core = core(chain(), WATCH);
    let mut exec = FakeExecutor::new(4);

    core.start(&mut exec).unwrap();
    let step = finish(
        &mut core,
        &mut exec,
        Ts,
        "x",
        CompileResult::Failed("boom".into()),
    );

    assert!(step.keep_running);
    assert!(!core.is_finished());
    // The failed job still gets its watch so a fix can trigger a rebuild.
    assert!(step.commands.contains(&CoreCommand::RegisterWatch {
        asset_type: Ts,
        unit: "x".into(),
        assets_dir: PathBuf::from("/units/x/assets"),
    }));
    assert!(exec.is_in_flight(&key(Ts, "y")));
}

#[test]
fn capacity_one_runs_independent_jobs_one_at_a_time() {
    let registry = RegistryBuilder::new()
        .unit("a", &[Ts], &[])
        .unit("b", &[Ts], &[])
        .unit("c", &[Ts], &[])
        .build();
    let mut core = core(registry, BATCH);
    let mut exec = FakeExecutor::new(1);

    core.start(&mut exec).unwrap();
    assert_eq!(exec.in_flight_keys(), [key(Ts, "a")]);

    finish(&mut core, &mut exec, Ts, "a", Changed);
    assert_eq!(exec.in_flight_keys(), [key(Ts, "b")]);

    finish(&mut core, &mut exec, Ts, "b", Changed);
    assert_eq!(exec.in_flight_keys(), [key(Ts, "c")]);

    let step = finish(&mut core, &mut exec, Ts, "c", Changed);
    assert!(has_finish(&step.commands, &RunOutcome::Success));
    assert_eq!(exec.peak(), 1);
}

#[test]
fn asset_types_are_dispatched_in_priority_order() {
    let registry = RegistryBuilder::new()
        .unit("p", &[CompressCss, Less, Ts, E2e], &[])
        .build();
    let mut core = core(registry, BATCH);
    let mut exec = FakeExecutor::new(4);

    core.start(&mut exec).unwrap();
    assert_eq!(
        exec.submitted_keys(),
        [key(E2e, "p"), key(Ts, "p"), key(Less, "p"), key(CompressCss, "p")]
    );
}

#[test]
fn backoff_stops_the_tick_before_lower_priority_types() {
    let registry = RegistryBuilder::new()
        .unit("a", &[Ts], &[])
        .unit("b", &[Less], &[])
        .build();
    let options = BATCH;
    let mut scheduler = Scheduler::new(registry, &options, "/repo");
    let mut exec = FakeExecutor::new(1);

    let tick = scheduler.tick(&mut exec).unwrap();
    assert_eq!(tick.dispatched, [key(Ts, "a")]);
    assert!(tick.backoff);
    assert!(!tick.quiescent);
    assert_eq!(scheduler.tracker(Less).unwrap().state_of("b"), Some(JobState::Pending));

    // Still full: nothing moves.
    let tick = scheduler.tick(&mut exec).unwrap();
    assert!(tick.dispatched.is_empty());
    assert!(tick.backoff);
}

#[test]
fn production_mode_skips_test_assets_entirely() {
    let registry = RegistryBuilder::new()
        .unit("p", &[E2e, Ts], &[])
        .build();
    let options = RunOptions {
        production: true,
        ..BATCH
    };
    let mut core = core(registry, options);
    let mut exec = FakeExecutor::new(4);

    core.start(&mut exec).unwrap();
    assert!(core.scheduler().tracker(E2e).is_none());
    assert_eq!(exec.submitted_keys(), [key(Ts, "p")]);
    assert!(exec.submitted()[0].production);

    let step = finish(&mut core, &mut exec, Ts, "p", Unchanged);
    assert!(has_finish(&step.commands, &RunOutcome::Success));
}

#[test]
fn compile_requests_carry_paths_and_flags() {
    let registry = RegistryBuilder::new()
        .with_root("/repo")
        .unit("base", &[Ts], &[])
        .unit("app", &[Ts], &["base"])
        .build();
    let options = RunOptions {
        verbose: true,
        ..BATCH
    };
    let mut core = core(registry, options);
    let mut exec = FakeExecutor::new(4);

    core.start(&mut exec).unwrap();
    finish(&mut core, &mut exec, Ts, "base", Unchanged);

    let req = &exec.submitted()[1];
    assert_eq!(req.unit, "app");
    assert_eq!(req.asset_type, Ts);
    assert_eq!(req.unit_dir, PathBuf::from("/repo/app"));
    assert_eq!(req.assets_dir, PathBuf::from("/repo/app/assets"));
    assert_eq!(req.dependency_paths, [PathBuf::from("/repo/base")]);
    assert_eq!(req.root_dir, PathBuf::from("/repo"));
    assert!(!req.production);
    assert!(req.verbose);
}

#[test]
fn watch_is_registered_once_per_job() {
    let registry = RegistryBuilder::new().unit("x", &[Ts, Less], &[]).build();
    let mut core = core(registry, WATCH);
    let mut exec = FakeExecutor::new(4);

    core.start(&mut exec).unwrap();
    let step = finish(&mut core, &mut exec, Ts, "x", Unchanged);
    assert_eq!(
        step.commands,
        [CoreCommand::RegisterWatch {
            asset_type: Ts,
            unit: "x".into(),
            assets_dir: PathBuf::from("/units/x/assets"),
        }]
    );

    let step = finish(&mut core, &mut exec, Less, "x", Unchanged);
    assert_eq!(
        step.commands,
        [
            CoreCommand::RegisterWatch {
                asset_type: Less,
                unit: "x".into(),
                assets_dir: PathBuf::from("/units/x/assets"),
            },
            CoreCommand::AnnounceIdle,
        ]
    );

    core.step(
        RuntimeEvent::SourceChanged {
            asset_type: Less,
            unit: "x".into(),
        },
        &mut exec,
    )
    .unwrap();
    let step = finish(&mut core, &mut exec, Less, "x", Unchanged);
    assert_eq!(step.commands, [CoreCommand::AnnounceIdle]);
}

#[test]
fn source_change_while_processing_reruns_after_completion() {
    let registry = RegistryBuilder::new().unit("x", &[Ts], &[]).build();
    let mut core = core(registry, WATCH);
    let mut exec = FakeExecutor::new(4);

    core.start(&mut exec).unwrap();
    let step = core
        .step(
            RuntimeEvent::SourceChanged {
                asset_type: Ts,
                unit: "x".into(),
            },
            &mut exec,
        )
        .unwrap();
    // No second instance while the first is running.
    assert!(step.commands.is_empty());
    assert_eq!(exec.submitted().len(), 1);

    let step = finish(&mut core, &mut exec, Ts, "x", Unchanged);
    assert_eq!(exec.submitted().len(), 2);
    assert!(!step.commands.contains(&CoreCommand::AnnounceIdle));

    let step = finish(&mut core, &mut exec, Ts, "x", Unchanged);
    assert_eq!(step.commands, [CoreCommand::AnnounceIdle]);
}

#[test]
fn empty_registry_finishes_immediately_in_batch_mode() {
    let mut core = core(UnitRegistry::default(), BATCH);
    let mut exec = FakeExecutor::new(1);

    let step = core.start(&mut exec).unwrap();
    assert!(!step.keep_running);
    assert!(has_finish(&step.commands, &RunOutcome::Success));
}

#[test]
fn watch_failure_closes_only_that_watch() {
    let mut core = core(chain(), WATCH);
    let mut exec = FakeExecutor::new(4);
    core.start(&mut exec).unwrap();

    let step = core
        .step(
            RuntimeEvent::WatchFailed {
                asset_type: Ts,
                unit: "x".into(),
                error: "inotify limit".into(),
            },
            &mut exec,
        )
        .unwrap();
    assert!(step.keep_running);
    assert_eq!(
        step.commands,
        [CoreCommand::CloseWatch {
            asset_type: Ts,
            unit: "x".into(),
        }]
    );
}

#[test]
fn shutdown_stops_the_run() {
    let mut core = core(chain(), WATCH);
    let mut exec = FakeExecutor::new(4);
    core.start(&mut exec).unwrap();

    let step = core.step(RuntimeEvent::ShutdownRequested, &mut exec).unwrap();
    assert!(!step.keep_running);
    assert!(has_finish(&step.commands, &RunOutcome::Stopped));

    // Results arriving after the stop are discarded.
    let step = finish(&mut core, &mut exec, Ts, "x", Changed);
    assert!(step.commands.is_empty());
    assert_eq!(exec.submitted().len(), 1);
}
