// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run status and the status transition guard (spec.md §4.1).

use serde::{Deserialize, Serialize};

/// Status of a run. Terminal statuses are `Complete`, `Failed`, `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Complete,
    Failed,
    Cancelled,
}

crate::simple_display! {
    RunStatus {
        Pending => "pending",
        Running => "running",
        Complete => "complete",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Failed | RunStatus::Cancelled)
    }
}

/// Error raised when a status transition would violate the run lifecycle.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("illegal run status transition: {from} -> {to}")]
pub struct StatusTransitionError {
    pub from: RunStatus,
    pub to: RunStatus,
}

/// Validate a `RunRecord.status` transition (spec.md §4.1).
///
/// Allowed: `pending -> pending|running|cancelled`, `running ->
/// running|terminal`. Everything else, including any transition out of a
/// terminal status, is rejected. `pending -> cancelled` is reachable
/// whenever `cancel` races a run that hasn't been picked up by its worker
/// yet; without it, cancelling a pending run would append `run:cancelled`
/// to the event log while `run.json` stayed `pending` forever.
pub fn ensure_run_status_transition(
    current: RunStatus,
    next: RunStatus,
) -> Result<(), StatusTransitionError> {
    use RunStatus::*;
    let allowed = matches!(
        (current, next),
        (Pending, Pending)
            | (Pending, Running)
            | (Pending, Cancelled)
            | (Running, Running)
            | (Running, Complete)
            | (Running, Failed)
            | (Running, Cancelled)
    );
    if allowed {
        Ok(())
    } else {
        Err(StatusTransitionError { from: current, to: next })
    }
}
