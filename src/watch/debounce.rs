// src/watch/debounce.rs

//! Trailing-edge debounce between raw watcher signals and the runtime.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use crate::dag::JobKey;
use crate::engine::RuntimeEvent;
use crate::watch::patterns::WatchPattern;

/// Default quiet window before a burst of changes triggers a rebuild.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Raw signal forwarded from the filesystem watcher callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    /// A file below the watch directory was created, modified or removed.
    Change(PathBuf),
    /// A directory below the watch directory was removed.
    DirRemoved(PathBuf),
    /// The underlying watcher reported an error.
    Error(String),
}

/// Which signals count and where they are relative to.
#[derive(Debug, Clone)]
pub struct SignalFilter {
    pub watch_dir: PathBuf,
    pub pattern: WatchPattern,
}

impl SignalFilter {
    fn accepts(&self, signal_path: &std::path::Path) -> bool {
        self.pattern.matches_path(&self.watch_dir, signal_path)
    }
}

/// Coalesce signals for one job into `SourceChanged` events.
///
/// Every relevant signal (re)starts a `window` timer; the event is sent once
/// the timer runs out without further signals. Irrelevant paths never touch
/// the timer. A watcher error is forwarded as `WatchFailed` and ends the
/// loop, as does a closed signal channel (pending changes are dropped).
pub async fn debounce_signals(
    key: JobKey,
    mut signals: mpsc::UnboundedReceiver<WatchSignal>,
    filter: SignalFilter,
    window: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Some(WatchSignal::Change(path)) => {
                    if filter.accepts(&path) {
                        trace!(job = %key, path = %path.display(), "source change");
                        deadline = Some(Instant::now() + window);
                    } else {
                        trace!(job = %key, path = %path.display(), "ignoring unrelated path");
                    }
                }
                Some(WatchSignal::DirRemoved(path)) => {
                    trace!(job = %key, path = %path.display(), "directory removed");
                    deadline = Some(Instant::now() + window);
                }
                Some(WatchSignal::Error(error)) => {
                    let event = RuntimeEvent::WatchFailed {
                        asset_type: key.asset_type,
                        unit: key.unit.clone(),
                        error,
                    };
                    let _ = runtime_tx.send(event).await;
                    break;
                }
                None => break,
            },
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                debug!(job = %key, "debounce window elapsed; invalidating");
                let event = RuntimeEvent::SourceChanged {
                    asset_type: key.asset_type,
                    unit: key.unit.clone(),
                };
                if runtime_tx.send(event).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!(job = %key, "debounce loop finished");
}
