// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mill-drivers: the [`DriverRuntime`] trait plus conforming instances — a
//! local-subprocess driver and a remote (websocket) driver — and the
//! `test-support`-gated in-memory fake used throughout the test suite
//! (spec.md §4.4, GLOSSARY "Driver").

mod fake;
mod local;
mod remote;

use async_trait::async_trait;
use mill_core::{RunId, SpawnId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use fake::FakeDriver;
pub use local::LocalDriver;
pub use remote::RemoteDriver;

/// One structured event a driver emits while handling a spawn, folded by the
/// engine into `spawn:milestone` / `spawn:tool_call` (spec.md §4.5 step 5).
/// Other driver event kinds are ignored by construction — this enum only has
/// variants for the ones the engine understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverEvent {
    Milestone { message: String },
    ToolCall { tool_name: String },
}

/// Input to [`DriverRuntime::spawn`] (spec.md §4.5 step 3).
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub run_id: RunId,
    pub run_directory: PathBuf,
    pub spawn_id: SpawnId,
    pub agent: String,
    pub system_prompt: String,
    pub prompt: String,
    pub model: String,
}

/// What a driver invocation produces: raw I/O lines destined for tier-2
/// events, structured [`DriverEvent`]s destined for tier-1 events, and a
/// final result payload the engine decodes against the `SpawnResult` schema
/// (spec.md §4.5 steps 4-6).
#[derive(Debug, Clone, Default)]
pub struct DriverOutput {
    pub io_lines: Vec<String>,
    pub events: Vec<DriverEvent>,
    pub result: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("driver process failed to start: {0}")]
    Spawn(String),
    #[error("driver I/O error: {0}")]
    Io(String),
    #[error("driver produced malformed output: {0}")]
    Protocol(String),
}

/// A generic adapter over a local subprocess or remote endpoint (GLOSSARY
/// "Driver"). The core never interprets `sessionRef`; it only decodes the
/// `result` payload against `SpawnResult`.
#[async_trait]
pub trait DriverRuntime: Send + Sync {
    async fn spawn(&self, request: SpawnRequest) -> Result<DriverOutput, DriverError>;
}
