// src/dag/tick.rs

//! Result type of a single scheduler tick.

use crate::dag::job::JobKey;

/// Structured result of one [`Scheduler::tick`](crate::dag::Scheduler::tick).
///
/// Useful for tests that step the scheduler manually and assert on what was
/// dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tick {
    /// Jobs submitted to the executor during this tick, in submission order.
    pub dispatched: Vec<JobKey>,
    /// The tick stopped early because the executor had no free capacity.
    pub backoff: bool,
    /// Nothing is pending or in flight in any tracker.
    pub quiescent: bool,
}
