// tests/watch_runtime.rs

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};

use assetflow::dag::{JobKey, Scheduler};
use assetflow::engine::{CoreRuntime, RunOptions, RunOutcome, Runtime, RuntimeEvent};
use assetflow::exec::WorkerPool;
use assetflow::types::AssetType;
use assetflow::watch::WatchRegistry;
use assetflow_test_utils::{init_tracing, with_timeout, RegistryBuilder, ScriptedCompiler};

const WINDOW: Duration = Duration::from_millis(300);

fn watch_options() -> RunOptions {
    RunOptions {
        watch: true,
        ..RunOptions::default()
    }
}

/// A single ts unit `x` rooted in `root`, with `x/assets/ts` on disk.
fn runtime_for(
    root: &Path,
    compiler: ScriptedCompiler,
) -> (Runtime<WorkerPool>, mpsc::Sender<RuntimeEvent>) {
    fs::create_dir_all(root.join("x/assets/ts")).unwrap();
    let registry = RegistryBuilder::new()
        .with_root(root)
        .unit("x", &[AssetType::TypeScript], &[])
        .build();

    let options = watch_options();
    let (tx, rx) = mpsc::channel(64);
    let pool = WorkerPool::new(Arc::new(compiler), 2, tx.clone());
    let watches = WatchRegistry::new(tx.clone(), WINDOW);
    let core = CoreRuntime::new(Scheduler::new(registry, &options, root), options);
    (Runtime::new(core, rx, pool, watches), tx)
}

async fn wait_for_calls(compiler: &ScriptedCompiler, n: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while compiler.calls().len() < n {
        assert!(
            Instant::now() < deadline,
            "expected {n} compile calls, saw {}",
            compiler.calls().len()
        );
        sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn burst_of_source_writes_triggers_one_rebuild() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let compiler = ScriptedCompiler::new();
    let (runtime, tx) = runtime_for(dir.path(), compiler.clone());
    let handle = tokio::spawn(runtime.run());

    // Initial build, after which the watch on x/assets/ts is established.
    wait_for_calls(&compiler, 1).await;
    sleep(Duration::from_millis(200)).await;

    let ts_dir = dir.path().join("x/assets/ts");
    for i in 0..3 {
        fs::write(ts_dir.join(format!("module{i}.ts")), "export {}\n").unwrap();
        sleep(Duration::from_millis(30)).await;
    }
    fs::write(ts_dir.join("bundle.js"), "// output\n").unwrap();

    wait_for_calls(&compiler, 2).await;
    sleep(WINDOW * 3).await;
    assert_eq!(compiler.call_count(AssetType::TypeScript, "x"), 2);

    // Output-only writes never trigger a rebuild.
    fs::write(ts_dir.join("bundle.js"), "// output v2\n").unwrap();
    sleep(WINDOW * 3).await;
    assert_eq!(compiler.call_count(AssetType::TypeScript, "x"), 2);

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    let outcome = with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(outcome, RunOutcome::Stopped);
}

#[tokio::test]
async fn failed_watch_is_closed_and_stops_rebuilding() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let compiler = ScriptedCompiler::new();
    let (runtime, tx) = runtime_for(dir.path(), compiler.clone());
    let handle = tokio::spawn(runtime.run());

    wait_for_calls(&compiler, 1).await;
    sleep(Duration::from_millis(200)).await;

    tx.send(RuntimeEvent::WatchFailed {
        asset_type: AssetType::TypeScript,
        unit: "x".into(),
        error: "watch limit reached".into(),
    })
    .await
    .unwrap();
    sleep(Duration::from_millis(100)).await;

    fs::write(dir.path().join("x/assets/ts/main.ts"), "export {}\n").unwrap();
    sleep(WINDOW * 3).await;
    assert_eq!(compiler.call_count(AssetType::TypeScript, "x"), 1);

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();
    assert_eq!(with_timeout(handle).await.unwrap().unwrap(), RunOutcome::Stopped);
}

#[tokio::test]
async fn registry_watches_existing_directories_only() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("x/assets");
    fs::create_dir_all(assets.join("less")).unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let mut watches = WatchRegistry::new(tx, WINDOW);

    let less = JobKey::new(AssetType::Less, "x");
    let ts = JobKey::new(AssetType::TypeScript, "x");

    // No `assets/ts` directory: nothing to watch.
    assert!(watches.register(ts.clone(), &assets).is_err());
    assert!(!watches.is_watching(&ts));

    watches.register(less.clone(), &assets).unwrap();
    watches.register(less.clone(), &assets).unwrap();
    assert_eq!(watches.len(), 1);

    // Events only arrive after registration; the file below is the first.
    fs::write(assets.join("less/theme.less"), "@c: red;\n").unwrap();
    let event = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("debounced change")
        .expect("channel open");
    assert!(
        matches!(
            &event,
            RuntimeEvent::SourceChanged { asset_type: AssetType::Less, unit } if unit == "x"
        ),
        "got {event:?}"
    );

    assert!(watches.close(&less));
    assert!(!watches.close(&less));
    assert!(watches.is_empty());
}
