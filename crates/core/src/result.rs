// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal run outcome, persisted once to `result.json` (spec.md §3, §4.2).

use crate::spawn::SpawnResult;
use crate::status::RunStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: String,
    pub status: RunStatus,
    pub started_at: String,
    pub completed_at: String,
    pub spawns: Vec<SpawnResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl RunResult {
    /// `status` must be one of the terminal statuses; this is enforced by
    /// construction in the engine rather than here, since the type system
    /// has no dependent-type way to express "terminal RunStatus" cheaply.
    pub fn is_well_formed(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_requires_terminal_status() {
        let result = RunResult {
            run_id: "run_1".into(),
            status: RunStatus::Complete,
            started_at: "2026-01-01T00:00:00Z".into(),
            completed_at: "2026-01-01T00:00:01Z".into(),
            spawns: vec![],
            program_result: None,
            error_message: None,
        };
        assert!(result.is_well_formed());

        let mut pending = result.clone();
        pending.status = RunStatus::Pending;
        assert!(!pending.is_well_formed());
    }

    #[test]
    fn round_trips_through_json() {
        let result = RunResult {
            run_id: "run_1".into(),
            status: RunStatus::Failed,
            started_at: "2026-01-01T00:00:00Z".into(),
            completed_at: "2026-01-01T00:00:01Z".into(),
            spawns: vec![],
            program_result: None,
            error_message: Some("boom".into()),
        };
        let json = serde_json::to_string_pretty(&result).unwrap();
        let back: RunResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
