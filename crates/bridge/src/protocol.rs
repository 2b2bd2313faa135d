// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bridge's wire protocol (spec.md §4.6, §6 "Wire protocol"). Child
//! stdout lines prefixed with [`SENTINEL`] are protocol messages; everything
//! else is raw program I/O. Parent responses are always JSON, one per line,
//! unprefixed — the child never mixes its own output onto stdin.

use serde::Serialize;

pub const SENTINEL: &str = "__MILL_HOST__";

/// One parsed line of child stdout.
pub enum ChildLine {
    Request { request_id: String, request_type: String, body: serde_json::Value },
    Result { ok: bool, value: serde_json::Value, message: Option<String> },
    Io(String),
}

pub fn parse_child_line(line: &str) -> ChildLine {
    let Some(payload) = line.strip_prefix(SENTINEL) else {
        return ChildLine::Io(line.to_string());
    };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(payload.trim_start()) else {
        return ChildLine::Io(line.to_string());
    };
    match value.get("kind").and_then(|k| k.as_str()) {
        Some("request") => ChildLine::Request {
            request_id: value.get("requestId").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            request_type: value
                .get("requestType")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            body: value,
        },
        Some("result") => ChildLine::Result {
            ok: value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            value: value.get("value").cloned().unwrap_or(serde_json::Value::Null),
            message: value.get("message").and_then(|v| v.as_str()).map(str::to_string),
        },
        _ => ChildLine::Io(line.to_string()),
    }
}

/// A `{kind:"response", requestId, ok, value|message}` line written to the
/// child's stdin (spec.md §4.6).
#[derive(Serialize)]
pub struct ParentResponse {
    kind: &'static str,
    request_id: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ParentResponse {
    pub fn ok(request_id: String, value: serde_json::Value) -> Self {
        Self { kind: "response", request_id, ok: true, value: Some(value), message: None }
    }

    pub fn err(request_id: String, message: String) -> Self {
        Self { kind: "response", request_id, ok: false, value: None, message: Some(message) }
    }
}
