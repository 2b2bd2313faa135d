// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A local-subprocess [`DriverRuntime`]: spawns a configured command, writes
//! the spawn request as one JSON line on stdin, and reads newline-delimited
//! JSON lines on stdout. A line `{"kind": "milestone"|"tool_call", ...}` is a
//! structured [`DriverEvent`]; `{"kind": "result", "result": <SpawnResult>}`
//! is the terminal payload; `{"kind": "error", "message": ...}` is a driver
//! failure; any other line (including non-JSON) is raw tier-2 I/O.

use crate::{DriverError, DriverEvent, DriverOutput, DriverRuntime, SpawnRequest};
use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

/// A local-subprocess driver, e.g. a vendor CLI wrapping a model invocation.
/// `command` is the argv to exec; the spawn request is passed on stdin, not
/// as argv, so no request field ever needs shell-escaping.
#[derive(Debug, Clone)]
pub struct LocalDriver {
    command: Vec<String>,
}

impl LocalDriver {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn name(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or("local")
    }
}

#[derive(Serialize)]
struct WireRequest<'a> {
    run_id: &'a str,
    spawn_id: &'a str,
    agent: &'a str,
    system_prompt: &'a str,
    prompt: &'a str,
    model: &'a str,
}

#[async_trait]
impl DriverRuntime for LocalDriver {
    async fn spawn(&self, request: SpawnRequest) -> Result<DriverOutput, DriverError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(DriverError::Spawn("empty driver command".into()));
        };

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&request.run_directory)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DriverError::Spawn(e.to_string()))?;

        let wire = WireRequest {
            run_id: request.run_id.as_str(),
            spawn_id: request.spawn_id.as_str(),
            agent: &request.agent,
            system_prompt: &request.system_prompt,
            prompt: &request.prompt,
            model: &request.model,
        };
        let mut line = serde_json::to_string(&wire).map_err(|e| DriverError::Protocol(e.to_string()))?;
        line.push('\n');

        let mut stdin = child.stdin.take().ok_or_else(|| DriverError::Spawn("no stdin".into()))?;
        stdin.write_all(line.as_bytes()).await.map_err(|e| DriverError::Io(e.to_string()))?;
        drop(stdin);

        let stdout = child.stdout.take().ok_or_else(|| DriverError::Spawn("no stdout".into()))?;
        let stderr = child.stderr.take().ok_or_else(|| DriverError::Spawn("no stderr".into()))?;

        let mut output = DriverOutput::default();
        let mut terminal: Option<Result<serde_json::Value, String>> = None;

        let mut stdout_lines = BufReader::new(stdout).lines();
        while let Some(raw_line) = stdout_lines.next_line().await.map_err(|e| DriverError::Io(e.to_string()))? {
            match parse_wire_line(&raw_line) {
                WireLine::Milestone { message } => output.events.push(DriverEvent::Milestone { message }),
                WireLine::ToolCall { tool_name } => output.events.push(DriverEvent::ToolCall { tool_name }),
                WireLine::Result(value) => terminal = Some(Ok(value)),
                WireLine::Error(message) => terminal = Some(Err(message)),
                WireLine::Raw => output.io_lines.push(raw_line),
            }
        }

        let mut stderr_lines = BufReader::new(stderr).lines();
        while let Some(raw_line) = stderr_lines.next_line().await.map_err(|e| DriverError::Io(e.to_string()))? {
            output.io_lines.push(raw_line);
        }

        let status = child.wait().await.map_err(|e| DriverError::Io(e.to_string()))?;

        match terminal {
            Some(Ok(result)) => {
                output.result = result;
                Ok(output)
            }
            Some(Err(message)) => Err(DriverError::Protocol(message)),
            None if status.success() => {
                Err(DriverError::Protocol(format!("driver {} exited with no result line", self.name())))
            }
            None => Err(DriverError::Protocol(format!(
                "driver {} exited with status {status} and no result line",
                self.name()
            ))),
        }
    }
}

enum WireLine {
    Milestone { message: String },
    ToolCall { tool_name: String },
    Result(serde_json::Value),
    Error(String),
    Raw,
}

fn parse_wire_line(line: &str) -> WireLine {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
        return WireLine::Raw;
    };
    match value.get("kind").and_then(|k| k.as_str()) {
        Some("milestone") => WireLine::Milestone {
            message: value.get("message").and_then(|m| m.as_str()).unwrap_or_default().to_string(),
        },
        Some("tool_call") => WireLine::ToolCall {
            tool_name: value.get("tool_name").and_then(|m| m.as_str()).unwrap_or_default().to_string(),
        },
        Some("result") => WireLine::Result(value.get("result").cloned().unwrap_or(serde_json::Value::Null)),
        Some("error") => WireLine::Error(value.get("message").and_then(|m| m.as_str()).unwrap_or("driver error").to_string()),
        _ => WireLine::Raw,
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
