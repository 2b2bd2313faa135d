// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-spawn Effect and the [`ProgramExecutor`] contract it is handed to
//! (spec.md §4.5 "the per-spawn Effect", §4.6 GLOSSARY "program host").

use async_trait::async_trait;
use mill_core::{
    Error, EventPayload, IoSource, IoStream, IoStreamEvent, RunId, SpawnCounter, SpawnId,
    SpawnOptions, SpawnResult,
};
use mill_drivers::{DriverEvent, DriverRuntime, SpawnRequest};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::extension::ExtensionContext;
use crate::shared::EngineShared;

/// The engine-supplied per-spawn effect. One instance is handed to the
/// [`ProgramExecutor`] for the lifetime of a single `runSync` call; cloning
/// it is cheap (shared counter + accumulator behind `Arc`).
#[derive(Clone)]
pub struct SpawnEffect {
    shared: Arc<EngineShared>,
    run_id: RunId,
    run_directory: PathBuf,
    counter: Arc<SpawnCounter>,
    spawns: Arc<Mutex<Vec<SpawnResult>>>,
}

impl SpawnEffect {
    pub(crate) fn new(
        shared: Arc<EngineShared>,
        run_id: RunId,
        run_directory: PathBuf,
        counter: Arc<SpawnCounter>,
        spawns: Arc<Mutex<Vec<SpawnResult>>>,
    ) -> Self {
        Self { shared, run_id, run_directory, counter, spawns }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn run_directory(&self) -> &Path {
        &self.run_directory
    }

    /// spec.md §4.5 steps 1-8: allocate a spawn id, emit `spawn:start`,
    /// invoke the driver, fold its output into tier-1/tier-2 events, and
    /// emit exactly one spawn terminal before returning the result to the
    /// program.
    pub async fn spawn(&self, input: SpawnOptions) -> Result<SpawnResult, Error> {
        input
            .validate()
            .map_err(|e| Error::program_execution(self.run_id.to_string(), e.to_string()))?;

        let spawn_id = self.counter.next();

        self.shared
            .emit(&self.run_id, &self.run_directory, |_sequence| EventPayload::SpawnStart {
                spawn_id: spawn_id.clone(),
                input: input.clone(),
            })
            .await?;

        let model = input
            .model
            .clone()
            .or_else(|| self.shared.default_model.clone())
            .unwrap_or_else(|| "default".to_string());

        let request = SpawnRequest {
            run_id: self.run_id.clone(),
            run_directory: self.run_directory.clone(),
            spawn_id: spawn_id.clone(),
            agent: input.agent.clone(),
            system_prompt: input.system_prompt.clone(),
            prompt: input.prompt.clone(),
            model,
        };

        let output = match self.shared.driver.spawn(request).await {
            Ok(output) => output,
            Err(err) => return Err(self.fail_spawn(&spawn_id, err.to_string()).await),
        };

        for line in output.io_lines {
            self.shared.hub.publish_io(IoStreamEvent {
                run_id: self.run_id.clone(),
                source: IoSource::Driver,
                stream: IoStream::Stdout,
                line,
                timestamp: self.shared.clock.iso_now(),
                spawn_id: Some(spawn_id.clone()),
            });
        }

        for event in output.events {
            let emitted = match event {
                DriverEvent::Milestone { message } => {
                    self.shared
                        .emit(&self.run_id, &self.run_directory, |_| EventPayload::SpawnMilestone {
                            spawn_id: spawn_id.clone(),
                            message,
                        })
                        .await
                }
                DriverEvent::ToolCall { tool_name } => {
                    self.shared
                        .emit(&self.run_id, &self.run_directory, |_| EventPayload::SpawnToolCall {
                            spawn_id: spawn_id.clone(),
                            tool_name,
                        })
                        .await
                }
            };
            emitted?;
        }

        let result: SpawnResult = match serde_json::from_value(output.result) {
            Ok(result) => result,
            Err(err) => {
                return Err(self.fail_spawn(&spawn_id, format!("malformed spawn result: {err}")).await)
            }
        };

        self.shared
            .emit(&self.run_id, &self.run_directory, |_| EventPayload::SpawnComplete {
                spawn_id: spawn_id.clone(),
                result: result.clone(),
            })
            .await?;

        self.spawns.lock().push(result.clone());
        Ok(result)
    }

    /// Forward one raw line of program output as a tier-2 I/O event
    /// (spec.md §4.6: non-sentinel stdout and all stderr from the program
    /// host). Never persisted — broadcast-only, same as driver I/O.
    pub fn publish_program_io(&self, stream: IoStream, line: String) {
        self.shared.hub.publish_io(IoStreamEvent {
            run_id: self.run_id.clone(),
            source: IoSource::Program,
            stream,
            line,
            timestamp: self.shared.clock.iso_now(),
            spawn_id: None,
        });
    }

    /// Dispatch one `extension` request from the program host bridge
    /// (spec.md §4.6 dispatch loop): look up
    /// `extensions[extensionName].api[methodName]` and invoke it, or fail
    /// with "unknown extension api" if either name is not registered.
    pub async fn call_extension_api(
        &self,
        extension_name: &str,
        method_name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        let method = self
            .shared
            .extensions
            .iter()
            .find(|e| e.name == extension_name)
            .and_then(|e| e.api.get(method_name))
            .ok_or_else(|| {
                format!("Unknown extension api {extension_name}.{method_name}")
            })?;
        let context =
            ExtensionContext { run_id: self.run_id.clone(), run_directory: self.run_directory.clone() };
        method.call(args, &context).await
    }

    async fn fail_spawn(&self, spawn_id: &SpawnId, message: String) -> Error {
        let _ = self
            .shared
            .emit(&self.run_id, &self.run_directory, |_| EventPayload::SpawnError {
                spawn_id: spawn_id.clone(),
                message: message.clone(),
            })
            .await;
        Error::program_execution(self.run_id.to_string(), message)
    }
}

/// What runs the user program for one run (GLOSSARY "program host"). The
/// subprocess bridge in `mill-bridge` and in-memory test fixtures both
/// conform to this; `Engine::run_sync` never knows which.
#[async_trait]
pub trait ProgramExecutor: Send + Sync {
    /// Run the program and return its `programResult` (spec.md §3
    /// `RunResult.programResult`), or the pretty-printed cause of an
    /// unhandled program error.
    async fn execute(
        &self,
        run_id: &RunId,
        run_directory: &Path,
        program_path: &str,
        spawn: SpawnEffect,
    ) -> Result<Option<String>, String>;
}
