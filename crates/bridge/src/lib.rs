// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C6: the program host bridge. Runs the user program in a child process so
//! it can be killed independently of the worker and written with full access
//! to the host language's standard library; the engine's `spawn` Effect is
//! never exposed to the program as an in-process call (spec.md §4.6).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod host_program;
mod protocol;

use async_trait::async_trait;
use mill_core::{IoStream, RunId, SpawnOptions};
use mill_engine::{ProgramExecutor, SpawnEffect};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use protocol::{ChildLine, ParentResponse};

/// Configuration for launching the program host process. `runtime_command`
/// is the argv prefix the generated host program is appended to, e.g.
/// `["node"]`; callers resolve this from the executor registration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub runtime_command: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { runtime_command: vec!["node".to_string()] }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("program host failed to start: {0}")]
    Spawn(String),
    #[error("program host I/O error: {0}")]
    Io(String),
}

/// A [`ProgramExecutor`] that bootstraps and drives the program host over
/// the wire protocol described in spec.md §4.6.
pub struct SubprocessProgramExecutor {
    config: BridgeConfig,
}

impl SubprocessProgramExecutor {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ProgramExecutor for SubprocessProgramExecutor {
    async fn execute(
        &self,
        run_id: &RunId,
        run_directory: &Path,
        program_path: &str,
        spawn: SpawnEffect,
    ) -> Result<Option<String>, String> {
        bootstrap(run_id, run_directory, program_path).map_err(|e| e.to_string())?;

        let Some((program, args)) = self.config.runtime_command.split_first() else {
            return Err("empty runtime command".to_string());
        };
        let host_program_file = run_directory.join("program-host.ts");

        let mut child = Command::new(program)
            .args(args)
            .arg(&host_program_file)
            .current_dir(run_directory)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("failed to start program host: {e}"))?;

        let stdin = child.stdin.take().ok_or("program host has no stdin")?;
        let stdout = child.stdout.take().ok_or("program host has no stdout")?;
        let stderr = child.stderr.take().ok_or("program host has no stderr")?;

        let (response_tx, response_rx) = mpsc::unbounded_channel::<ParentResponse>();
        let (terminal_tx, terminal_rx) = oneshot::channel::<Result<serde_json::Value, String>>();
        let terminal_tx = Arc::new(Mutex::new(Some(terminal_tx)));
        let stderr_buffer = Arc::new(Mutex::new(Vec::<String>::new()));

        let writer = tokio::spawn(write_responses(stdin, response_rx));
        let reader = tokio::spawn(read_requests(
            stdout,
            spawn.clone(),
            response_tx.clone(),
            Arc::clone(&terminal_tx),
        ));
        let stderr_reader =
            tokio::spawn(read_stderr(stderr, spawn.clone(), Arc::clone(&stderr_buffer)));

        let terminal = terminal_rx.await.ok();
        drop(response_tx);

        let _ = reader.await;
        let _ = writer.await;
        let _ = stderr_reader.await;

        let status = child.wait().await.map_err(|e| format!("program host wait failed: {e}"))?;
        let stderr_context = stderr_buffer.lock().join("\n");

        match (terminal, status.success()) {
            (Some(Ok(value)), true) => Ok(program_result_of(value)),
            (Some(Ok(_)), false) => Err(format!(
                "program host exited with code {} despite reporting success; stderr: {stderr_context}",
                status.code().unwrap_or(-1)
            )),
            (Some(Err(message)), _) => Err(format!("{message}; stderr: {stderr_context}")),
            (None, true) => Err(format!(
                "program host exited with no terminal result; stderr: {stderr_context}"
            )),
            (None, false) => Err(format!(
                "program host exited with code {} and no terminal result; stderr: {stderr_context}",
                status.code().unwrap_or(-1)
            )),
        }
    }
}

fn program_result_of(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn bootstrap(run_id: &RunId, run_directory: &Path, program_path: &str) -> Result<(), BridgeError> {
    let marker = format!(
        "process-host:node\nrunId={run_id}\nexecutor=local\nprogramPath={program_path}\n"
    );
    std::fs::write(run_directory.join("program-host.marker"), marker)
        .map_err(|e| BridgeError::Io(e.to_string()))?;

    let body = std::fs::read_to_string(run_directory.join("program.ts"))
        .or_else(|_| std::fs::read_to_string(program_path))
        .map_err(|e| BridgeError::Io(e.to_string()))?;
    let host_program = format!("{}\n{}\n{}", host_program::PRELUDE, body, host_program::SUFFIX);
    std::fs::write(run_directory.join("program-host.ts"), host_program)
        .map_err(|e| BridgeError::Io(e.to_string()))?;
    Ok(())
}

async fn write_responses(
    mut stdin: tokio::process::ChildStdin,
    mut responses: mpsc::UnboundedReceiver<ParentResponse>,
) {
    while let Some(response) = responses.recv().await {
        let Ok(mut line) = serde_json::to_string(&response) else { continue };
        line.push('\n');
        if stdin.write_all(line.as_bytes()).await.is_err() {
            break;
        }
    }
    let _ = stdin.shutdown().await;
}

async fn read_requests(
    stdout: tokio::process::ChildStdout,
    spawn: SpawnEffect,
    responses: mpsc::UnboundedSender<ParentResponse>,
    terminal_tx: Arc<Mutex<Option<oneshot::Sender<Result<serde_json::Value, String>>>>>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let next = match lines.next_line().await {
            Ok(next) => next,
            Err(_) => break,
        };
        let Some(raw_line) = next else { break };
        match protocol::parse_child_line(&raw_line) {
            ChildLine::Request { request_id, request_type, body } => {
                let spawn = spawn.clone();
                let responses = responses.clone();
                tokio::spawn(async move {
                    let outcome = dispatch_request(&spawn, &request_type, body).await;
                    let response = match outcome {
                        Ok(value) => ParentResponse::ok(request_id, value),
                        Err(message) => ParentResponse::err(request_id, message),
                    };
                    let _ = responses.send(response);
                });
            }
            ChildLine::Result { ok, value, message } => {
                let outcome = if ok { Ok(value) } else { Err(message.unwrap_or_default()) };
                if let Some(tx) = terminal_tx.lock().take() {
                    let _ = tx.send(outcome);
                }
            }
            ChildLine::Io(line) => spawn.publish_program_io(IoStream::Stdout, line),
        }
    }
}

async fn read_stderr(
    stderr: tokio::process::ChildStderr,
    spawn: SpawnEffect,
    buffer: Arc<Mutex<Vec<String>>>,
) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        buffer.lock().push(line.clone());
        spawn.publish_program_io(IoStream::Stderr, line);
    }
}

async fn dispatch_request(
    spawn: &SpawnEffect,
    request_type: &str,
    body: serde_json::Value,
) -> Result<serde_json::Value, String> {
    match request_type {
        "spawn" => {
            let input: SpawnOptions = serde_json::from_value(
                body.get("input").cloned().unwrap_or(serde_json::Value::Null),
            )
            .map_err(|e| format!("malformed spawn request: {e}"))?;
            let result = spawn.spawn(input).await.map_err(|e| e.to_string())?;
            serde_json::to_value(result).map_err(|e| e.to_string())
        }
        "extension" => {
            let extension_name =
                body.get("extensionName").and_then(|v| v.as_str()).unwrap_or_default();
            let method_name = body.get("methodName").and_then(|v| v.as_str()).unwrap_or_default();
            let args = body.get("args").cloned().unwrap_or(serde_json::Value::Array(vec![]));
            spawn.call_extension_api(extension_name, method_name, args).await
        }
        other => Err(format!("unknown request type {other:?}")),
    }
}
