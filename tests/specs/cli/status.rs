//! `mill status` (spec.md §6).

use crate::prelude::*;
use mill_core::{RunId, RunStatus};

#[test]
fn prints_the_current_record() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Running);

    project
        .mill()
        .args(&["status", run_id.as_str()])
        .passes()
        .stdout_has(run_id.as_str())
        .stdout_has("running");
}

#[test]
fn json_flag_emits_a_run_record() {
    let project = Project::empty();
    let run_id = RunId::new();
    project.seed_run(&run_id, RunStatus::Pending);

    let assertion = project.mill().args(&["--json", "status", run_id.as_str()]).passes();
    let value: serde_json::Value = serde_json::from_str(&assertion.stdout()).unwrap();
    assert_eq!(value["id"], run_id.as_str());
    assert_eq!(value["status"], "pending");
}

#[test]
fn unknown_run_id_fails() {
    let project = Project::empty();
    project.mill().args(&["status", "run_does_not_exist"]).fails().code_is(1);
}
