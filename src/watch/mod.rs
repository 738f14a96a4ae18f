// src/watch/mod.rs

//! File watching and invalidation.
//!
//! This module is responsible for:
//! - Compiling the per-asset-type source patterns.
//! - Wiring up one cross-platform filesystem watcher (`notify`) per watched
//!   job, gated until the watch is established.
//! - Debouncing bursts of changes into a single `SourceChanged` event.
//!
//! It does **not** know about job states; it only turns filesystem changes
//! into job-level invalidations for the runtime.

pub mod debounce;
pub mod path_utils;
pub mod patterns;
pub mod registry;
pub mod watcher;

pub use debounce::{debounce_signals, SignalFilter, WatchSignal, DEFAULT_DEBOUNCE};
pub use patterns::WatchPattern;
pub use registry::WatchRegistry;
pub use watcher::{signals_for, spawn_unit_watch, UnitWatch};
