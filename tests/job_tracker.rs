// tests/job_tracker.rs

use assetflow::dag::{JobState, JobTracker, TypeGraph};
use assetflow::types::AssetType;
use assetflow_test_utils::RegistryBuilder;

use AssetType::TypeScript as Ts;

/// x <- y <- z, plus an independent w.
fn chain_tracker() -> JobTracker {
    let registry = RegistryBuilder::new()
        .unit("x", &[Ts], &[])
        .unit("y", &[Ts], &["x"])
        .unit("z", &[Ts], &["y"])
        .unit("w", &[Ts], &[])
        .build();
    JobTracker::new(&TypeGraph::project(&registry, Ts))
}

fn run(tracker: &mut JobTracker, unit: &str, changed: bool) {
    let job = tracker.job_id(unit).unwrap();
    tracker.mark_processing(job);
    tracker.mark_completed(job, changed);
}

#[test]
fn jobs_without_dependencies_are_ready_immediately() {
    let tracker = chain_tracker();
    let ready: Vec<&str> = tracker
        .ready_jobs()
        .into_iter()
        .map(|j| tracker.unit_name(j))
        .collect();
    assert_eq!(ready, ["x", "w"]);
    assert!(tracker.ready_jobs().iter().all(|&j| tracker.state(j) == JobState::Pending));
}

#[test]
fn readiness_queries_are_stable_without_transitions() {
    let tracker = chain_tracker();
    let first = tracker.next_ready_job();
    assert!(first.is_some());
    for _ in 0..5 {
        assert_eq!(tracker.next_ready_job(), first);
    }
    assert_eq!(tracker.ready_jobs(), tracker.ready_jobs());
}

#[test]
fn dependents_become_ready_once_dependencies_complete() {
    let mut tracker = chain_tracker();
    let y = tracker.job_id("y").unwrap();
    assert!(!tracker.ready_jobs().contains(&y));

    run(&mut tracker, "x", false);
    assert!(tracker.ready_jobs().contains(&y));
}

#[test]
fn changed_completion_demotes_completed_dependents() {
    let mut tracker = chain_tracker();
    run(&mut tracker, "x", false);
    run(&mut tracker, "y", false);
    run(&mut tracker, "z", false);
    assert_eq!(tracker.state_of("y"), Some(JobState::Completed));

    let x = tracker.job_id("x").unwrap();
    tracker.mark_dirty(x);
    tracker.mark_processing(x);
    let completion = tracker.mark_completed(x, true);

    assert_eq!(completion.invalidated, ["y"]);
    assert_eq!(tracker.state_of("y"), Some(JobState::Pending));
    // Only direct dependents are demoted.
    assert_eq!(tracker.state_of("z"), Some(JobState::Completed));
}

#[test]
fn unchanged_completion_leaves_dependents_alone() {
    let mut tracker = chain_tracker();
    run(&mut tracker, "x", false);
    run(&mut tracker, "y", false);

    let x = tracker.job_id("x").unwrap();
    tracker.mark_dirty(x);
    tracker.mark_processing(x);
    let completion = tracker.mark_completed(x, false);

    assert!(completion.invalidated.is_empty());
    assert_eq!(tracker.state_of("y"), Some(JobState::Completed));
}

#[test]
fn pending_and_processing_dependents_are_untouched_by_a_change() {
    let mut tracker = chain_tracker();
    run(&mut tracker, "x", false);

    // y is processing, z is pending.
    let y = tracker.job_id("y").unwrap();
    tracker.mark_processing(y);

    let x = tracker.job_id("x").unwrap();
    tracker.mark_dirty(x);
    tracker.mark_processing(x);
    let completion = tracker.mark_completed(x, true);

    assert!(completion.invalidated.is_empty());
    assert_eq!(tracker.state(y), JobState::Processing);
    assert_eq!(tracker.state_of("z"), Some(JobState::Pending));
}

#[test]
fn first_completion_is_reported_once() {
    let mut tracker = chain_tracker();
    let w = tracker.job_id("w").unwrap();

    tracker.mark_processing(w);
    assert!(tracker.mark_completed(w, true).first_completion);
    assert!(tracker.has_completed_once("w"));

    tracker.mark_dirty(w);
    tracker.mark_processing(w);
    assert!(!tracker.mark_completed(w, true).first_completion);
}

#[test]
fn dirty_while_processing_requeues_after_completion() {
    let mut tracker = chain_tracker();
    let w = tracker.job_id("w").unwrap();

    tracker.mark_processing(w);
    tracker.mark_dirty(w);
    // No preemption: still processing.
    assert_eq!(tracker.state(w), JobState::Processing);

    let completion = tracker.mark_completed(w, false);
    assert!(completion.requeued);
    assert_eq!(tracker.state(w), JobState::Pending);
    assert!(tracker.ready_jobs().contains(&w));
}

#[test]
fn dirtying_a_pending_job_is_a_no_op() {
    let mut tracker = chain_tracker();
    let z = tracker.job_id("z").unwrap();
    tracker.mark_dirty(z);
    assert_eq!(tracker.state(z), JobState::Pending);
    assert_eq!(tracker.pending(), 4);
}

#[test]
fn quiescent_only_when_everything_completed() {
    let mut tracker = chain_tracker();
    assert!(!tracker.is_quiescent());
    for unit in ["x", "w", "y", "z"] {
        run(&mut tracker, unit, false);
    }
    assert!(tracker.is_quiescent());
    assert_eq!(tracker.in_flight(), 0);
}

#[test]
#[should_panic(expected = "marked processing")]
fn starting_a_job_twice_panics() {
    let mut tracker = chain_tracker();
    let x = tracker.job_id("x").unwrap();
    tracker.mark_processing(x);
    tracker.mark_processing(x);
}

#[test]
#[should_panic(expected = "marked completed")]
fn completing_a_job_that_is_not_processing_panics() {
    let mut tracker = chain_tracker();
    let x = tracker.job_id("x").unwrap();
    tracker.mark_completed(x, false);
}
