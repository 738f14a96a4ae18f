// src/watch/registry.rs

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::JobKey;
use crate::engine::RuntimeEvent;
use crate::watch::watcher::{spawn_unit_watch, UnitWatch};

/// Every watch of the current run, keyed by job.
///
/// Owned by the runtime shell; `close_all` is called when the run stops.
#[derive(Debug)]
pub struct WatchRegistry {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    window: Duration,
    watches: HashMap<JobKey, UnitWatch>,
}

impl WatchRegistry {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, window: Duration) -> Self {
        Self {
            runtime_tx,
            window,
            watches: HashMap::new(),
        }
    }

    /// Start watching the sources of `key` below `assets_dir`.
    ///
    /// Registering an already watched job is a no-op.
    pub fn register(&mut self, key: JobKey, assets_dir: &Path) -> Result<()> {
        if self.watches.contains_key(&key) {
            debug!(job = %key, "already watching");
            return Ok(());
        }

        let watch = spawn_unit_watch(key.clone(), assets_dir, self.window, self.runtime_tx.clone())?;
        self.watches.insert(key, watch);
        Ok(())
    }

    /// Close a single watch. Returns false if `key` was not watched.
    pub fn close(&mut self, key: &JobKey) -> bool {
        match self.watches.remove(key) {
            Some(watch) => {
                watch.close();
                true
            }
            None => false,
        }
    }

    pub fn close_all(&mut self) {
        if self.watches.is_empty() {
            return;
        }
        info!(watches = self.watches.len(), "closing all watches");
        for (_, watch) in self.watches.drain() {
            watch.close();
        }
    }

    pub fn is_watching(&self, key: &JobKey) -> bool {
        self.watches.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }
}

impl Drop for WatchRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}
