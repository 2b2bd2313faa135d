//! `mill watch` (spec.md §4.5 `watch`, §5).

use crate::prelude::*;
use mill_core::{EventPayload, RunId, RunResult, RunStatus};

#[test]
fn backfills_every_event_and_exits_once_the_run_is_terminal() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Running);
    project.append(&run_id, EventPayload::RunStart { program_path: "/repo/program.ts".into() });
    let result = RunResult {
        run_id: run_id.to_string(),
        status: RunStatus::Complete,
        started_at: "2026-01-01T00:00:00.000Z".into(),
        completed_at: "2026-01-01T00:00:01.000Z".into(),
        spawns: vec![],
        program_result: Some("done".into()),
        error_message: None,
    };
    project.append(&run_id, EventPayload::RunComplete { result: result.clone() });
    project.set_result(&run_id, &result);

    project
        .mill()
        .args(&["watch", "--run", run_id.as_str()])
        .passes()
        .stdout_has("run:start")
        .stdout_has("run:complete");
}

#[test]
fn channel_io_is_refused_because_it_cannot_be_observed_cross_process() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Running);

    project
        .mill()
        .args(&["watch", "--run", run_id.as_str(), "--channel", "io"])
        .fails()
        .code_is(1);
}

#[test]
fn malformed_since_time_fails_before_watching() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Running);

    project
        .mill()
        .args(&["watch", "--run", run_id.as_str(), "--since-time", "not-a-timestamp"])
        .fails()
        .code_is(1);
}

#[test]
fn unknown_run_id_fails() {
    let project = Project::empty();
    project.mill().args(&["watch", "--run", "run_does_not_exist"]).fails().code_is(1);
}
