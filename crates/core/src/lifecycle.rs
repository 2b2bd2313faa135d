// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory lifecycle guard: the state machine that rejects illegal event
//! orderings before they are persisted or fanned out (spec.md §4.1).

use crate::error::Error;
use crate::event::{MillEvent, RunTerminalKind, SpawnTerminalKind};
use crate::id::SpawnId;
use std::collections::HashMap;

/// Tracks, for one run, whether the run has reached a terminal event and
/// which spawns within it have reached their own terminal event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleGuardState {
    run_terminal: Option<RunTerminalKindTag>,
    spawn_terminals: HashMap<SpawnId, SpawnTerminalKindTag>,
}

// RunTerminalKind/SpawnTerminalKind don't derive Eq (kept minimal in event.rs);
// mirror them here so LifecycleGuardState can derive PartialEq/Eq for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunTerminalKindTag {
    Complete,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpawnTerminalKindTag {
    Complete,
    Error,
    Cancelled,
}

impl From<RunTerminalKind> for RunTerminalKindTag {
    fn from(kind: RunTerminalKind) -> Self {
        match kind {
            RunTerminalKind::Complete => RunTerminalKindTag::Complete,
            RunTerminalKind::Failed => RunTerminalKindTag::Failed,
            RunTerminalKind::Cancelled => RunTerminalKindTag::Cancelled,
        }
    }
}

impl From<SpawnTerminalKind> for SpawnTerminalKindTag {
    fn from(kind: SpawnTerminalKind) -> Self {
        match kind {
            SpawnTerminalKind::Complete => SpawnTerminalKindTag::Complete,
            SpawnTerminalKind::Error => SpawnTerminalKindTag::Error,
            SpawnTerminalKind::Cancelled => SpawnTerminalKindTag::Cancelled,
        }
    }
}

impl LifecycleGuardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_run_terminal(&self) -> bool {
        self.run_terminal.is_some()
    }

    pub fn has_spawn_terminal(&self, spawn_id: &SpawnId) -> bool {
        self.spawn_terminals.contains_key(spawn_id)
    }
}

/// Validate and fold `event` into `state`, producing the next state.
///
/// Rejects (without mutating `state`) if the run already has a terminal
/// event, or if the event's `spawnId` already has a terminal event recorded.
/// Otherwise returns a new state with the run/spawn terminal maps updated as
/// appropriate (spec.md §4.1).
pub fn apply_lifecycle_transition(
    state: &LifecycleGuardState,
    event: &MillEvent,
) -> Result<LifecycleGuardState, Error> {
    if state.is_run_terminal() {
        return Err(Error::lifecycle_invariant(
            event.run_id.to_string(),
            format!(
                "run already terminal; rejected event {}",
                event.payload.type_name()
            ),
        ));
    }
    if let Some(spawn_id) = event.payload.spawn_id() {
        if state.has_spawn_terminal(spawn_id) {
            return Err(Error::lifecycle_invariant(
                event.run_id.to_string(),
                format!(
                    "spawn {spawn_id} already terminal; rejected event {}",
                    event.payload.type_name()
                ),
            ));
        }
    }

    let mut next = state.clone();
    if let Some(kind) = event.payload.run_terminal_kind() {
        next.run_terminal = Some(kind.into());
    }
    if let Some(kind) = event.payload.spawn_terminal_kind() {
        if let Some(spawn_id) = event.payload.spawn_id() {
            next.spawn_terminals.insert(spawn_id.clone(), kind.into());
        }
    }
    Ok(next)
}

/// Fold an entire persisted event log from the initial state. Used both to
/// seed the engine's live guard on resumption and by the append-only
/// resumability property test (spec.md §8 property 4).
pub fn replay(events: &[MillEvent]) -> Result<LifecycleGuardState, Error> {
    let mut state = LifecycleGuardState::new();
    for event in events {
        state = apply_lifecycle_transition(&state, event)?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;
    use crate::id::RunId;
    use crate::result::RunResult;
    use crate::spawn::{SpawnOptions, SpawnResult};
    use crate::status::RunStatus;

    fn event(seq: u64, payload: EventPayload) -> MillEvent {
        MillEvent::new(RunId::from_string("run_1"), seq, "2026-01-01T00:00:00Z".into(), payload)
    }

    #[test]
    fn happy_path_sequence_is_accepted() {
        let events = vec![
            event(1, EventPayload::RunStart { program_path: "/x".into() }),
            event(2, EventPayload::RunStatus { status: RunStatus::Running }),
            event(
                3,
                EventPayload::SpawnStart {
                    spawn_id: SpawnId::from_counter(1),
                    input: SpawnOptions {
                        agent: "scout".into(),
                        system_prompt: "be concise".into(),
                        prompt: "hello".into(),
                        model: None,
                    },
                },
            ),
            event(
                4,
                EventPayload::SpawnComplete {
                    spawn_id: SpawnId::from_counter(1),
                    result: SpawnResult {
                        text: "driver:hello".into(),
                        session_ref: "session/scout".into(),
                        agent: "scout".into(),
                        model: "openai/gpt-5.3-codex".into(),
                        driver: "test".into(),
                        exit_code: 0,
                        stop_reason: None,
                        error_message: None,
                    },
                },
            ),
            event(
                5,
                EventPayload::RunComplete {
                    result: RunResult {
                        run_id: "run_1".into(),
                        status: RunStatus::Complete,
                        started_at: "2026-01-01T00:00:00Z".into(),
                        completed_at: "2026-01-01T00:00:01Z".into(),
                        spawns: vec![],
                        program_result: None,
                        error_message: None,
                    },
                },
            ),
        ];
        let state = replay(&events).unwrap();
        assert!(state.is_run_terminal());
    }

    #[test]
    fn rejects_event_after_run_terminal() {
        let terminal = event(
            1,
            EventPayload::RunFailed { message: "boom".into() },
        );
        let state = apply_lifecycle_transition(&LifecycleGuardState::new(), &terminal).unwrap();
        let after = event(2, EventPayload::RunStatus { status: RunStatus::Running });
        assert!(apply_lifecycle_transition(&state, &after).is_err());
    }

    #[test]
    fn rejects_duplicate_spawn_terminal() {
        let spawn_id = SpawnId::from_counter(1);
        let first = event(
            1,
            EventPayload::SpawnCancelled {
                spawn_id: spawn_id.clone(),
                reason: None,
            },
        );
        let state = apply_lifecycle_transition(&LifecycleGuardState::new(), &first).unwrap();
        let second = event(
            2,
            EventPayload::SpawnMilestone {
                spawn_id,
                message: "still going?".into(),
            },
        );
        assert!(apply_lifecycle_transition(&state, &second).is_err());
    }
}
