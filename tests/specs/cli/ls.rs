//! `mill ls` (spec.md §6): enumerate runs sorted by `createdAt` descending.

use crate::prelude::*;
use mill_core::{RunId, RunStatus};

#[test]
fn empty_runs_directory_prints_placeholder() {
    let project = Project::empty();
    project.mill().args(&["ls"]).passes().stdout_has("no runs");
}

#[test]
fn lists_every_seeded_run() {
    let project = Project::empty();
    let a = RunId::new();
    let b = RunId::new();
    project.seed_run(&a, RunStatus::Complete);
    project.seed_run(&b, RunStatus::Running);

    let assertion = project.mill().args(&["--json", "ls"]).passes();
    let value: serde_json::Value = serde_json::from_str(&assertion.stdout()).unwrap();
    let ids: Vec<&str> = value.as_array().unwrap().iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&a.as_str()));
    assert!(ids.contains(&b.as_str()));
}

#[test]
fn status_filter_narrows_the_list() {
    let project = Project::empty();
    let running = RunId::new();
    let complete = RunId::new();
    project.seed_run(&running, RunStatus::Running);
    project.seed_run(&complete, RunStatus::Complete);

    project
        .mill()
        .args(&["ls", "--status", "complete"])
        .passes()
        .stdout_has(complete.as_str());

    let assertion = project.mill().args(&["--json", "ls", "--status", "complete"]).passes();
    let value: serde_json::Value = serde_json::from_str(&assertion.stdout()).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 1);
}

#[test]
fn unknown_status_filter_fails() {
    let project = Project::empty();
    project.mill().args(&["ls", "--status", "bogus"]).fails().code_is(1);
}
