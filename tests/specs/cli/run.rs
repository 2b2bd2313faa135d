//! `mill run` (spec.md §4.9 `submitRun`, §5 recursion guard).
//!
//! These specs only exercise failure paths that are decided before a
//! worker is ever launched, so they never depend on an external `node`/
//! driver runtime being installed on the test machine.

use crate::prelude::*;

#[test]
fn recursion_guard_rejects_a_run_at_the_configured_depth() {
    let project = Project::empty();
    let program = project.home_path().join("program.ts");
    std::fs::write(&program, "mill.spawn({ prompt: \"hi\" })").unwrap();

    project
        .mill()
        .env("MILL_RUN_DEPTH", "1")
        .args(&["run", program.to_str().unwrap()])
        .fails()
        .code_is(1)
        .stderr_has("maxRunDepth");
}

#[test]
fn missing_program_file_fails_before_any_worker_launches() {
    let project = Project::empty();
    let missing = project.home_path().join("does-not-exist.ts");

    project.mill().args(&["run", missing.to_str().unwrap()]).fails().code_is(1);
}
