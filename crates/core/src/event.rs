// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tier-1 event schema: a closed, schema-versioned tagged union, plus the
//! ephemeral tier-2 I/O event (spec.md §3).

use crate::id::{RunId, SpawnId};
use crate::result::RunResult;
use crate::spawn::{SpawnOptions, SpawnResult};
use crate::status::RunStatus;
use serde::{Deserialize, Serialize};

/// The only schema version the core currently understands. Bumped whenever
/// [`EventPayload`] gains or changes a variant's wire shape.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionHook {
    Setup,
    OnEvent,
}

/// Closed discriminated union of tier-1 event kinds. Adjacently tagged on
/// `type`/`payload` to match the persisted envelope shape exactly — no base
/// class, no open extension point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum EventPayload {
    #[serde(rename = "run:start")]
    RunStart { program_path: String },
    #[serde(rename = "run:status")]
    RunStatus { status: RunStatus },
    #[serde(rename = "run:complete")]
    RunComplete { result: RunResult },
    #[serde(rename = "run:failed")]
    RunFailed { message: String },
    #[serde(rename = "run:cancelled")]
    RunCancelled {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "spawn:start")]
    SpawnStart { spawn_id: SpawnId, input: SpawnOptions },
    #[serde(rename = "spawn:milestone")]
    SpawnMilestone { spawn_id: SpawnId, message: String },
    #[serde(rename = "spawn:tool_call")]
    SpawnToolCall { spawn_id: SpawnId, tool_name: String },
    #[serde(rename = "spawn:error")]
    SpawnError { spawn_id: SpawnId, message: String },
    #[serde(rename = "spawn:complete")]
    SpawnComplete { spawn_id: SpawnId, result: SpawnResult },
    #[serde(rename = "spawn:cancelled")]
    SpawnCancelled {
        spawn_id: SpawnId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    #[serde(rename = "extension:error")]
    ExtensionError {
        extension_name: String,
        hook: ExtensionHook,
        message: String,
    },
}

/// The kind of a run-terminal event, without its payload. Used by the
/// lifecycle guard, which only needs to know *that* a run finished and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTerminalKind {
    Complete,
    Failed,
    Cancelled,
}

/// The kind of a spawn-terminal event, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnTerminalKind {
    Complete,
    Error,
    Cancelled,
}

impl EventPayload {
    /// The `type` discriminant as written on the wire, e.g. `"spawn:start"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::RunStart { .. } => "run:start",
            EventPayload::RunStatus { .. } => "run:status",
            EventPayload::RunComplete { .. } => "run:complete",
            EventPayload::RunFailed { .. } => "run:failed",
            EventPayload::RunCancelled { .. } => "run:cancelled",
            EventPayload::SpawnStart { .. } => "spawn:start",
            EventPayload::SpawnMilestone { .. } => "spawn:milestone",
            EventPayload::SpawnToolCall { .. } => "spawn:tool_call",
            EventPayload::SpawnError { .. } => "spawn:error",
            EventPayload::SpawnComplete { .. } => "spawn:complete",
            EventPayload::SpawnCancelled { .. } => "spawn:cancelled",
            EventPayload::ExtensionError { .. } => "extension:error",
        }
    }

    /// The `spawnId` carried by this event, if any (spec.md §4.1: the
    /// lifecycle guard keys off this to detect spawn-terminal duplicates).
    pub fn spawn_id(&self) -> Option<&SpawnId> {
        match self {
            EventPayload::SpawnStart { spawn_id, .. }
            | EventPayload::SpawnMilestone { spawn_id, .. }
            | EventPayload::SpawnToolCall { spawn_id, .. }
            | EventPayload::SpawnError { spawn_id, .. }
            | EventPayload::SpawnComplete { spawn_id, .. }
            | EventPayload::SpawnCancelled { spawn_id, .. } => Some(spawn_id),
            _ => None,
        }
    }

    pub fn run_terminal_kind(&self) -> Option<RunTerminalKind> {
        match self {
            EventPayload::RunComplete { .. } => Some(RunTerminalKind::Complete),
            EventPayload::RunFailed { .. } => Some(RunTerminalKind::Failed),
            EventPayload::RunCancelled { .. } => Some(RunTerminalKind::Cancelled),
            _ => None,
        }
    }

    pub fn spawn_terminal_kind(&self) -> Option<SpawnTerminalKind> {
        match self {
            EventPayload::SpawnComplete { .. } => Some(SpawnTerminalKind::Complete),
            EventPayload::SpawnError { .. } => Some(SpawnTerminalKind::Error),
            EventPayload::SpawnCancelled { .. } => Some(SpawnTerminalKind::Cancelled),
            _ => None,
        }
    }

    /// `true` for `extension:error`, the one event type the lifecycle guard
    /// and engine's `onEvent` fan-out must not recurse into (spec.md §4.7).
    pub fn is_extension_error(&self) -> bool {
        matches!(self, EventPayload::ExtensionError { .. })
    }
}

/// A persisted tier-1 event: the common envelope plus its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MillEvent {
    pub schema_version: u32,
    pub run_id: RunId,
    pub sequence: u64,
    pub timestamp: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl MillEvent {
    pub fn new(run_id: RunId, sequence: u64, timestamp: String, payload: EventPayload) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id,
            sequence,
            timestamp,
            payload,
        }
    }
}

/// Error decoding a single persisted event line.
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("malformed event JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown schema version {found}, expected {expected}")]
    UnknownSchemaVersion { found: u32, expected: u32 },
}

/// Encode one event as a single NDJSON line (no trailing newline — callers
/// append it, matching `events.ndjson`'s LF-per-line convention).
pub fn encode_event(event: &MillEvent) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

/// Decode one NDJSON line. Fails on malformed JSON or an unrecognized
/// `schemaVersion` (spec.md §3: "decoders fail on unknown versions").
pub fn decode_event(line: &str) -> Result<MillEvent, EventDecodeError> {
    let raw: serde_json::Value = serde_json::from_str(line)?;
    let found = raw
        .get("schemaVersion")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0) as u32;
    if found != SCHEMA_VERSION {
        return Err(EventDecodeError::UnknownSchemaVersion {
            found,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(serde_json::from_value(raw)?)
}

/// Tier-2 I/O event: ephemeral, broadcast via the observer hub only, never
/// persisted (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoSource {
    Driver,
    Program,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IoStreamEvent {
    pub run_id: RunId,
    pub source: IoSource,
    pub stream: IoStream,
    pub line: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_id: Option<SpawnId>,
}
