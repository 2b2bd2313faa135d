//! `mill wait` (spec.md §4.5 `wait`, §5, §8 property 9).

use crate::prelude::*;
use mill_core::{EventPayload, RunId, RunResult, RunStatus};

#[test]
fn times_out_on_an_idle_running_run_with_exit_code_2() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Running);
    project.append(&run_id, EventPayload::RunStart { program_path: "/repo/program.ts".into() });

    project
        .mill()
        .args(&["wait", run_id.as_str(), "--timeout", "0.04"])
        .fails()
        .code_is(2);
}

#[test]
fn resolves_immediately_for_an_already_terminal_run() {
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
        .args(&["wait", run_id.as_str(), "--timeout", "2"])
        .passes()
        .stdout_has("complete");
}

#[test]
fn unknown_run_id_fails_before_polling() {
    let project = Project::empty();
    project
        .mill()
        .args(&["wait", "run_does_not_exist", "--timeout", "1"])
        .fails()
        .code_is(1);
}
