// src/engine/mod.rs

//! Orchestration engine for assetflow.
//!
//! This module ties together:
//! - the scheduler and its per-type job trackers
//! - the executor backend running compile steps
//! - the watch registry (watch mode only)
//! - the main runtime event loop that reacts to:
//!   - compile completions
//!   - debounced source changes
//!   - watch failures
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::dag::UnitName;
use crate::exec::CompileResult;
use crate::types::AssetType;

/// Options fixed for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Keep running after the first quiescence and rebuild on source changes.
    pub watch: bool,
    /// Production build: the test-only asset type is skipped entirely.
    pub production: bool,
    /// Forwarded to compilers.
    pub verbose: bool,
}

/// Events flowing into the runtime from workers, watchers and signals.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A compile step submitted to the executor finished.
    CompileFinished {
        asset_type: AssetType,
        unit: UnitName,
        result: CompileResult,
    },
    /// Debounced source change for a watched (asset type, unit).
    SourceChanged {
        asset_type: AssetType,
        unit: UnitName,
    },
    /// A watch failed after it was established.
    WatchFailed {
        asset_type: AssetType,
        unit: UnitName,
        error: String,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Batch mode reached quiescence without failures.
    Success,
    /// Batch mode compile failure.
    Failed {
        unit: UnitName,
        asset_type: AssetType,
        detail: String,
    },
    /// Stopped externally.
    Stopped,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
