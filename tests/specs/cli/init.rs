//! `mill init` (spec.md §6 `init`).

use crate::prelude::*;

#[test]
fn writes_a_global_config_under_home() {
    let project = Project::empty();
    project.mill().args(&["init", "--global"]).passes().stderr_has("wrote");

    let config_path = project.home_path().join(".mill.toml");
    assert!(config_path.exists());
    let contents = std::fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("runsDirectory"));
}

#[test]
fn refuses_to_overwrite_an_existing_config() {
    let project = Project::empty();
    project.mill().args(&["init", "--global"]).passes();
    project.mill().args(&["init", "--global"]).fails().code_is(1);
}
