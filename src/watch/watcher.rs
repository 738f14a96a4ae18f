// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::event::RemoveKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dag::JobKey;
use crate::engine::RuntimeEvent;
use crate::watch::debounce::{debounce_signals, SignalFilter, WatchSignal};
use crate::watch::patterns::WatchPattern;

/// A live watch on one unit's sources for one asset type.
///
/// Holds the `RecommendedWatcher` and its debounce task. Dropping the handle
/// stops the watcher; [`UnitWatch::close`] also stops the debounce task so a
/// pending rebuild is discarded.
pub struct UnitWatch {
    key: JobKey,
    watch_dir: PathBuf,
    _watcher: RecommendedWatcher,
    debounce: JoinHandle<()>,
}

impl std::fmt::Debug for UnitWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitWatch")
            .field("key", &self.key)
            .field("watch_dir", &self.watch_dir)
            .finish_non_exhaustive()
    }
}

impl UnitWatch {
    pub fn close(self) {
        self.debounce.abort();
        debug!(job = %self.key, "watch closed");
    }
}

/// Start watching `<assets_dir>/<type subdir>` for the job `key`.
///
/// Events are only forwarded once the underlying watch is established;
/// anything the backend reports before that is dropped. Debounced changes
/// arrive on `runtime_tx` as `RuntimeEvent::SourceChanged`.
pub fn spawn_unit_watch(
    key: JobKey,
    assets_dir: &Path,
    window: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<UnitWatch> {
    let pattern = WatchPattern::for_asset_type(key.asset_type)?;
    let watch_dir = pattern.watch_dir(assets_dir);
    // Canonicalize once so we have a stable base path.
    let watch_dir = watch_dir
        .canonicalize()
        .with_context(|| format!("resolving watch directory {}", watch_dir.display()))?;

    let ready = Arc::new(AtomicBool::new(false));
    let (signal_tx, signal_rx) = mpsc::unbounded_channel::<WatchSignal>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        {
            let ready = Arc::clone(&ready);
            move |res: notify::Result<Event>| {
                if !ready.load(Ordering::Acquire) {
                    return;
                }
                match res {
                    Ok(event) => {
                        for signal in signals_for(event) {
                            // The receiver only goes away when the watch is closed.
                            let _ = signal_tx.send(signal);
                        }
                    }
                    Err(err) => {
                        let _ = signal_tx.send(WatchSignal::Error(err.to_string()));
                    }
                }
            }
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(&watch_dir, RecursiveMode::Recursive)
        .with_context(|| format!("watching {}", watch_dir.display()))?;
    ready.store(true, Ordering::Release);

    info!(job = %key, dir = %watch_dir.display(), "watching sources");

    let filter = SignalFilter {
        watch_dir: watch_dir.clone(),
        pattern,
    };
    let debounce = tokio::spawn(debounce_signals(
        key.clone(),
        signal_rx,
        filter,
        window,
        runtime_tx,
    ));

    Ok(UnitWatch {
        key,
        watch_dir,
        _watcher: watcher,
        debounce,
    })
}

/// Translate a notify event into watch signals.
///
/// Creations, modifications and removals count; access events do not.
pub fn signals_for(event: Event) -> Vec<WatchSignal> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => {
            event.paths.into_iter().map(WatchSignal::Change).collect()
        }
        EventKind::Remove(RemoveKind::Folder) => {
            event.paths.into_iter().map(WatchSignal::DirRemoved).collect()
        }
        EventKind::Remove(_) => event.paths.into_iter().map(WatchSignal::Change).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}
