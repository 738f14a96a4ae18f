// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, Manifest};
use crate::dag::{Scheduler, TypeGraph, UnitRegistry};
use crate::engine::{CoreRuntime, RunOptions, RunOutcome, Runtime, RuntimeEvent};
use crate::errors::AssetflowError;
use crate::exec::{CommandCompiler, WorkerPool};
use crate::types::AssetType;
use crate::watch::WatchRegistry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading
/// - unit registry (optionally restricted to `--plugin` roots)
/// - scheduler / core / runtime
/// - worker pool running the configured compilers
/// - watch registry (watch mode)
/// - Ctrl-C handling
///
/// A batch-mode compile failure is returned as
/// [`AssetflowError::CompileFailed`].
pub async fn run(args: CliArgs) -> Result<()> {
    let manifest_path = PathBuf::from(&args.manifest);
    let manifest = load_and_validate(&manifest_path)?;
    let root_dir = manifest_root_dir(&manifest_path);

    let registry = build_registry(&manifest, &root_dir, &args.plugins)?;

    let options = RunOptions {
        watch: args.watch,
        production: args.production || manifest.config().production,
        verbose: args.verbose,
    };

    if args.dry_run {
        print_dry_run(&registry, &options);
        return Ok(());
    }

    let max_parallelism = resolve_parallelism(args.threads, &manifest)?;
    info!(
        units = registry.len(),
        max_parallelism,
        watch = options.watch,
        production = options.production,
        "starting compilation"
    );

    let scheduler = Scheduler::new(registry, &options, root_dir);

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let compiler = CommandCompiler::from_manifest(&manifest)?;
    let executor = WorkerPool::new(Arc::new(compiler), max_parallelism, rt_tx.clone());

    let debounce = Duration::from_millis(manifest.config().debounce_ms);
    let watches = WatchRegistry::new(rt_tx.clone(), debounce);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for Ctrl+C");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }
    drop(rt_tx);

    // Construct the pure core runtime (single source of truth for semantics).
    let core = CoreRuntime::new(scheduler, options);

    // Construct the async IO shell around the core.
    let runtime = Runtime::new(core, rt_rx, executor, watches);
    match runtime.run().await? {
        RunOutcome::Success => {
            info!("all assets compiled");
            Ok(())
        }
        RunOutcome::Stopped => {
            info!("stopped");
            Ok(())
        }
        RunOutcome::Failed {
            unit,
            asset_type,
            detail,
        } => Err(AssetflowError::CompileFailed {
            unit,
            asset_type,
            detail,
        }
        .into()),
    }
}

/// Assemble the unit registry from the manifest, restricted to `roots` and
/// their transitive dependencies when any are given.
pub fn build_registry(
    manifest: &Manifest,
    root_dir: &Path,
    roots: &[String],
) -> errors::Result<UnitRegistry> {
    let registry = UnitRegistry::build(manifest.discovered_units(root_dir))?;
    if roots.is_empty() {
        return Ok(registry);
    }

    let restricted = registry.restrict_to(roots)?;
    debug!(?roots, units = restricted.len(), "restricted to root units");
    Ok(restricted)
}

/// Effective parallelism: `--threads`, then `[config].max_parallelism`, then
/// available cores minus one (at least one).
pub fn resolve_parallelism(cli_threads: Option<usize>, manifest: &Manifest) -> errors::Result<usize> {
    match cli_threads {
        Some(0) => Err(AssetflowError::ConfigError(
            "--threads must be >= 1 (got 0)".to_string(),
        )),
        Some(n) => Ok(n),
        None => Ok(manifest
            .config()
            .max_parallelism
            .unwrap_or_else(default_parallelism)),
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Directory compile commands run in and unit directories are resolved
/// against.
///
/// - If the manifest path has a non-empty parent (e.g. "web/Assetflow.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetflow.toml" (parent = ""),
///   we fall back to the current working directory "."
fn manifest_root_dir(manifest_path: &Path) -> PathBuf {
    match manifest_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Dry-run output: units, dependencies and the per-type graphs.
fn print_dry_run(registry: &UnitRegistry, options: &RunOptions) {
    println!("assetflow dry-run");
    println!("  production = {}", options.production);
    println!("  watch = {}", options.watch);
    println!();

    println!("units ({}):", registry.len());
    for unit in registry.iter() {
        println!("  - {}", unit.name());
        println!("      dir: {}", unit.dir().display());
        let types: Vec<&str> = unit.asset_types().map(AssetType::as_str).collect();
        if !types.is_empty() {
            println!("      assets: {types:?}");
        }
        if !unit.dependencies().is_empty() {
            println!("      depends: {:?}", unit.dependencies());
        }
    }

    for asset_type in AssetType::active(options.production) {
        let graph = TypeGraph::project(registry, asset_type);
        if graph.is_empty() {
            continue;
        }
        println!();
        println!("{asset_type} ({} units):", graph.len());
        for unit in graph.units() {
            let deps = graph.dependency_names(unit);
            if deps.is_empty() {
                println!("  - {unit}");
            } else {
                println!("  - {unit} <- {deps:?}");
            }
        }
    }

    debug!("dry-run complete (no compilation)");
}
