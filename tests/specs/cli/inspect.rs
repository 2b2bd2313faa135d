//! `mill inspect` (spec.md §4.5 `inspect`, §6: `ref` is `runId` or
//! `runId.spawnId`).

use crate::prelude::*;
use mill_core::{EventPayload, RunId, RunStatus, SpawnId, SpawnOptions, SpawnResult};

#[test]
fn run_scoped_inspection_lists_every_event() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Running);
    project.append(&run_id, EventPayload::RunStart { program_path: "/repo/program.ts".into() });

    project
        .mill()
        .args(&["inspect", run_id.as_str()])
        .passes()
        .stdout_has(run_id.as_str())
        .stdout_has("run:start");
}

#[test]
fn spawn_scoped_inspection_filters_to_one_spawn() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Running);
    let spawn_id = SpawnId::from_counter(1);
    let input = SpawnOptions {
        agent: "scout".into(),
        system_prompt: "be concise".into(),
        prompt: "hello".into(),
        model: None,
    };
    project.append(&run_id, EventPayload::SpawnStart { spawn_id: spawn_id.clone(), input });
    let result = SpawnResult {
        text: "done".into(),
        session_ref: "session-1".into(),
        agent: "scout".into(),
        model: "default".into(),
        driver: "local".into(),
        exit_code: 0,
        stop_reason: None,
        error_message: None,
    };
    project.append(&run_id, EventPayload::SpawnComplete { spawn_id: spawn_id.clone(), result });

    let reference = format!("{run_id}.{spawn_id}");
    project.mill().args(&["inspect", &reference]).passes().stdout_has("spawn:start").stdout_has("spawn:complete");
}

#[test]
fn session_flag_requires_a_spawn_scoped_reference() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Running);

    project.mill().args(&["inspect", run_id.as_str(), "--session"]).fails().code_is(1);
}

#[test]
fn unknown_run_id_fails() {
    let project = Project::empty();
    project.mill().args(&["inspect", "run_does_not_exist"]).fails().code_is(1);
}
