// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted run metadata (spec.md §3, §4.2).

use crate::status::RunStatus;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Absolute, deterministically derived paths under a run directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPaths {
    pub run_dir: PathBuf,
    pub run_file: PathBuf,
    pub events_file: PathBuf,
    pub result_file: PathBuf,
}

impl RunPaths {
    /// Derive the standard layout under `<runs_directory>/<run_id>/`.
    pub fn for_run(runs_directory: &Path, run_id: &str) -> Self {
        let run_dir = runs_directory.join(run_id);
        Self {
            run_file: run_dir.join("run.json"),
            events_file: run_dir.join("events.ndjson"),
            result_file: run_dir.join("result.json"),
            run_dir,
        }
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.run_dir.join("logs")
    }

    pub fn worker_pid_file(&self) -> PathBuf {
        self.run_dir.join("worker.pid")
    }

    pub fn program_copy_file(&self) -> PathBuf {
        self.run_dir.join("program.ts")
    }

    pub fn host_marker_file(&self) -> PathBuf {
        self.run_dir.join("program-host.marker")
    }

    pub fn host_program_file(&self) -> PathBuf {
        self.run_dir.join("program-host.ts")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: String,
    pub status: RunStatus,
    pub program_path: String,
    pub driver: String,
    pub executor: String,
    pub created_at: String,
    pub updated_at: String,
    pub paths: RunPaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_derived_under_runs_directory() {
        let paths = RunPaths::for_run(Path::new("/tmp/mill/runs"), "run_abc");
        assert_eq!(paths.run_dir, Path::new("/tmp/mill/runs/run_abc"));
        assert_eq!(paths.run_file, Path::new("/tmp/mill/runs/run_abc/run.json"));
        assert_eq!(
            paths.events_file,
            Path::new("/tmp/mill/runs/run_abc/events.ndjson")
        );
        assert_eq!(
            paths.result_file,
            Path::new("/tmp/mill/runs/run_abc/result.json")
        );
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = RunRecord {
            id: "run_abc".into(),
            status: RunStatus::Pending,
            program_path: "/repo/program.ts".into(),
            driver: "test".into(),
            executor: "local".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
            paths: RunPaths::for_run(Path::new("/tmp/mill/runs"), "run_abc"),
            metadata: None,
        };
        let json = serde_json::to_string_pretty(&record).unwrap();
        let back: RunRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
