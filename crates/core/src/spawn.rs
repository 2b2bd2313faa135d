// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawn input/output types (spec.md §3).

use serde::{Deserialize, Serialize};

/// Input to a single `mill.spawn(...)` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnOptions {
    pub agent: String,
    pub system_prompt: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Error raised when a [`SpawnOptions`] fails validation (non-empty fields).
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("invalid spawn input: {field} must not be empty")]
pub struct SpawnOptionsError {
    pub field: &'static str,
}

impl SpawnOptions {
    pub fn validate(&self) -> Result<(), SpawnOptionsError> {
        if self.agent.is_empty() {
            return Err(SpawnOptionsError { field: "agent" });
        }
        if self.system_prompt.is_empty() {
            return Err(SpawnOptionsError { field: "systemPrompt" });
        }
        if self.prompt.is_empty() {
            return Err(SpawnOptionsError { field: "prompt" });
        }
        if matches!(&self.model, Some(m) if m.is_empty()) {
            return Err(SpawnOptionsError { field: "model" });
        }
        Ok(())
    }
}

/// Result of a completed spawn, returned to the program and persisted on
/// `spawn:complete`. `session_ref` is an opaque driver-scoped pointer — the
/// core never interprets it (spec.md §3, GLOSSARY).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnResult {
    pub text: String,
    pub session_ref: String,
    pub agent: String,
    pub model: String,
    pub driver: String,
    pub exit_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SpawnOptions {
        SpawnOptions {
            agent: "scout".into(),
            system_prompt: "be concise".into(),
            prompt: "hello".into(),
            model: None,
        }
    }

    #[test]
    fn valid_options_pass() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn empty_agent_rejected() {
        let mut opts = valid();
        opts.agent.clear();
        assert_eq!(opts.validate().unwrap_err().field, "agent");
    }

    #[test]
    fn empty_model_rejected_when_present() {
        let mut opts = valid();
        opts.model = Some(String::new());
        assert_eq!(opts.validate().unwrap_err().field, "model");
    }

    #[test]
    fn round_trips_through_json() {
        let opts = valid();
        let json = serde_json::to_string(&opts).unwrap();
        let back: SpawnOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(opts, back);
    }
}
