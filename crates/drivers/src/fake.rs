// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory [`DriverRuntime`] used throughout the test suite in place of
//! a real subprocess or websocket driver. Canned outputs are queued per agent
//! name; a spawn for an agent with no queued output fails with
//! [`DriverError::Protocol`], which surfaces precisely the "driver
//! misconfigured" failure mode a real driver would produce.

use crate::{DriverError, DriverOutput, DriverRuntime, SpawnRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::VecDeque;

/// A fake driver backed by per-agent queues of canned [`DriverOutput`]s, or a
/// single canned error to return unconditionally.
#[derive(Default)]
pub struct FakeDriver {
    queues: Mutex<HashMap<String, VecDeque<Result<DriverOutput, String>>>>,
    calls: Mutex<Vec<SpawnRequest>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful output for the next spawn of `agent`.
    pub fn queue_output(&self, agent: impl Into<String>, output: DriverOutput) {
        self.queues.lock().entry(agent.into()).or_default().push_back(Ok(output));
    }

    /// Queue a failure for the next spawn of `agent`.
    pub fn queue_error(&self, agent: impl Into<String>, message: impl Into<String>) {
        self.queues.lock().entry(agent.into()).or_default().push_back(Err(message.into()));
    }

    /// Every spawn request this driver has observed, in order.
    pub fn calls(&self) -> Vec<SpawnRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl DriverRuntime for FakeDriver {
    async fn spawn(&self, request: SpawnRequest) -> Result<DriverOutput, DriverError> {
        self.calls.lock().push(request.clone());
        let queued = self.queues.lock().get_mut(&request.agent).and_then(VecDeque::pop_front);
        match queued {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(DriverError::Protocol(message)),
            None => Err(DriverError::Protocol(format!(
                "no fake output queued for agent '{}'",
                request.agent
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mill_core::{RunId, SpawnId};

    fn request(agent: &str) -> SpawnRequest {
        SpawnRequest {
            run_id: RunId::new(),
            run_directory: std::env::temp_dir(),
            spawn_id: SpawnId::from_counter(1),
            agent: agent.to_string(),
            system_prompt: "system".into(),
            prompt: "prompt".into(),
            model: "model".into(),
        }
    }

    #[tokio::test]
    async fn returns_queued_output_in_order() {
        let driver = FakeDriver::new();
        driver.queue_output("writer", DriverOutput { result: serde_json::json!({"text": "first"}), ..Default::default() });
        driver.queue_output("writer", DriverOutput { result: serde_json::json!({"text": "second"}), ..Default::default() });

        let first = driver.spawn(request("writer")).await.unwrap();
        assert_eq!(first.result["text"], "first");
        let second = driver.spawn(request("writer")).await.unwrap();
        assert_eq!(second.result["text"], "second");
    }

    #[tokio::test]
    async fn returns_queued_error() {
        let driver = FakeDriver::new();
        driver.queue_error("writer", "agent misconfigured");
        let err = driver.spawn(request("writer")).await.unwrap_err();
        assert!(matches!(err, DriverError::Protocol(message) if message == "agent misconfigured"));
    }

    #[tokio::test]
    async fn unqueued_agent_fails() {
        let driver = FakeDriver::new();
        let err = driver.spawn(request("nobody")).await.unwrap_err();
        assert!(matches!(err, DriverError::Protocol(_)));
    }

    #[tokio::test]
    async fn records_calls() {
        let driver = FakeDriver::new();
        driver.queue_output("writer", DriverOutput::default());
        driver.spawn(request("writer")).await.unwrap();
        assert_eq!(driver.calls().len(), 1);
        assert_eq!(driver.calls()[0].agent, "writer");
    }
}
