//! `mill cancel` (spec.md §4.9 `cancelRun`, §8 property 5 "cancel idempotence").

use crate::prelude::*;
use mill_core::{EventPayload, RunId, RunStatus};

#[test]
fn cancels_a_running_run_with_no_worker_pid() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Running);
    project.append(&run_id, EventPayload::RunStart { program_path: "/repo/program.ts".into() });

    project
        .mill()
        .args(&["cancel", run_id.as_str()])
        .passes()
        .stdout_has("cancelled")
        .stdout_has("alreadyTerminal=false");

    let record = project.store().get_run(&run_id).unwrap();
    assert_eq!(record.status, RunStatus::Cancelled);
}

#[test]
fn cancelling_twice_is_idempotent() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Running);
    project.append(&run_id, EventPayload::RunStart { program_path: "/repo/program.ts".into() });

    project.mill().args(&["cancel", run_id.as_str()]).passes();
    project
        .mill()
        .args(&["cancel", run_id.as_str()])
        .passes()
        .stdout_has("alreadyTerminal=true");

    let events = project.store().read_events(&run_id).unwrap();
    let cancellations =
        events.iter().filter(|e| matches!(e.payload, EventPayload::RunCancelled { .. })).count();
    assert_eq!(cancellations, 1);
}

#[test]
fn cancelling_a_pending_run_leaves_status_and_log_consistent() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Pending);

    project
        .mill()
        .args(&["cancel", run_id.as_str()])
        .passes()
        .stdout_has("cancelled")
        .stdout_has("alreadyTerminal=false");

    let record = project.store().get_run(&run_id).unwrap();
    assert_eq!(record.status, RunStatus::Cancelled);
    let events = project.store().read_events(&run_id).unwrap();
    assert!(events.iter().any(|e| matches!(e.payload, EventPayload::RunCancelled { .. })));
}

#[test]
fn unknown_run_id_fails() {
    let project = Project::empty();
    project.mill().args(&["cancel", "run_does_not_exist"]).fails().code_is(1);
}
