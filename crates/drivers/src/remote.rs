// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A remote (websocket) [`DriverRuntime`]: opens one connection per spawn,
//! sends a single `{"type": "spawn", ...}` text message, and reads tagged
//! text messages until a terminal `result`/`error` kind, following the same
//! wire vocabulary as [`crate::local::LocalDriver`] so the engine never needs
//! to know which transport produced an event.

use crate::{DriverError, DriverEvent, DriverOutput, DriverRuntime, SpawnRequest};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// A remote driver speaking to a websocket endpoint, e.g. a hosted agent
/// runner reachable over the network.
#[derive(Debug, Clone)]
pub struct RemoteDriver {
    endpoint: String,
}

impl RemoteDriver {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self { endpoint: endpoint.into() }
    }
}

#[derive(Serialize)]
struct WireSpawn<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    run_id: &'a str,
    spawn_id: &'a str,
    agent: &'a str,
    system_prompt: &'a str,
    prompt: &'a str,
    model: &'a str,
}

#[async_trait]
impl DriverRuntime for RemoteDriver {
    async fn spawn(&self, request: SpawnRequest) -> Result<DriverOutput, DriverError> {
        let (mut socket, _) = connect_async(&self.endpoint)
            .await
            .map_err(|e| DriverError::Spawn(e.to_string()))?;

        let wire = WireSpawn {
            kind: "spawn",
            run_id: request.run_id.as_str(),
            spawn_id: request.spawn_id.as_str(),
            agent: &request.agent,
            system_prompt: &request.system_prompt,
            prompt: &request.prompt,
            model: &request.model,
        };
        let payload = serde_json::to_string(&wire).map_err(|e| DriverError::Protocol(e.to_string()))?;
        socket.send(Message::Text(payload.into())).await.map_err(|e| DriverError::Io(e.to_string()))?;

        let mut output = DriverOutput::default();

        while let Some(message) = socket.next().await {
            let message = message.map_err(|e| DriverError::Io(e.to_string()))?;
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => continue,
            };

            match parse_wire_message(&text) {
                WireMessage::Milestone { message } => output.events.push(DriverEvent::Milestone { message }),
                WireMessage::ToolCall { tool_name } => output.events.push(DriverEvent::ToolCall { tool_name }),
                WireMessage::Result(value) => {
                    output.result = value;
                    let _ = socket.close(None).await;
                    return Ok(output);
                }
                WireMessage::Error(message) => return Err(DriverError::Protocol(message)),
                WireMessage::Raw => output.io_lines.push(text.to_string()),
            }
        }

        Err(DriverError::Protocol("remote driver closed connection with no result message".into()))
    }
}

enum WireMessage {
    Milestone { message: String },
    ToolCall { tool_name: String },
    Result(serde_json::Value),
    Error(String),
    Raw,
}

fn parse_wire_message(text: &str) -> WireMessage {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return WireMessage::Raw;
    };
    match value.get("kind").and_then(|k| k.as_str()) {
        Some("milestone") => WireMessage::Milestone {
            message: value.get("message").and_then(|m| m.as_str()).unwrap_or_default().to_string(),
        },
        Some("tool_call") => WireMessage::ToolCall {
            tool_name: value.get("tool_name").and_then(|m| m.as_str()).unwrap_or_default().to_string(),
        },
        Some("result") => WireMessage::Result(value.get("result").cloned().unwrap_or(serde_json::Value::Null)),
        Some("error") => {
            WireMessage::Error(value.get("message").and_then(|m| m.as_str()).unwrap_or("driver error").to_string())
        }
        _ => WireMessage::Raw,
    }
}
