// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C5: the Engine — the run lifecycle (spec.md §4.5). A factory
//! parameterized by `{runsDirectory, driverName, executorName, defaultModel,
//! driver, extensions}`, exposing submit/runSync/status/wait/watch/
//! watchAll/watchIo/inspect/cancel over the persisted run store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mill_core::{
    replay, Clock, EngineConfig, Error, EventPayload, ExtensionHook, MillEvent, RunId, RunRecord,
    RunResult, RunStatus, SpawnCounter, SpawnId, SpawnResult,
};
use mill_drivers::DriverRuntime;
use mill_store::{CreateRunRequest, RunStore};
use parking_lot::Mutex;

use crate::executor::{ProgramExecutor, SpawnEffect};
use crate::extension::{ExtensionContext, ExtensionRegistration};
use crate::observer::{EventStream, GlobalEventStream, IoEventStream, ObserverHub};
use crate::shared::EngineShared;

/// Fields needed to submit a run (spec.md §4.5 `submit`).
pub struct SubmitRequest {
    pub run_id: RunId,
    pub program_path: String,
    pub metadata: Option<serde_json::Value>,
}

/// Fields needed to drive a run to completion (spec.md §4.5 `runSync`).
pub struct RunSyncRequest {
    pub run_id: RunId,
    pub program_path: String,
    pub metadata: Option<serde_json::Value>,
}

/// `inspect`'s result shape, scoped to a run or to one spawn within it
/// (spec.md §4.5 `inspect`).
#[derive(Debug, Clone)]
pub enum InspectResult {
    Run {
        run: RunRecord,
        events: Vec<MillEvent>,
        result: Option<RunResult>,
    },
    Spawn {
        run_id: RunId,
        spawn_id: SpawnId,
        events: Vec<MillEvent>,
        result: Option<SpawnResult>,
    },
}

/// The run execution engine. Cheap to clone — everything lives behind the
/// shared `Arc<EngineShared>`.
#[derive(Clone)]
pub struct Engine {
    shared: Arc<EngineShared>,
}

impl Engine {
    pub fn new(
        config: &EngineConfig,
        driver: Arc<dyn DriverRuntime>,
        extensions: Vec<ExtensionRegistration>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_hub(config, driver, extensions, clock, Arc::new(ObserverHub::new()))
    }

    /// Construct with a caller-supplied [`ObserverHub`], so multiple engine
    /// handles in the same process (e.g. a worker and an in-process test
    /// observer) can share one pub/sub hub.
    pub fn with_hub(
        config: &EngineConfig,
        driver: Arc<dyn DriverRuntime>,
        extensions: Vec<ExtensionRegistration>,
        clock: Arc<dyn Clock>,
        hub: Arc<ObserverHub>,
    ) -> Self {
        let store = RunStore::new(config.runs_directory.clone());
        Self {
            shared: Arc::new(EngineShared {
                store,
                hub,
                clock,
                extensions,
                driver,
                default_model: config.default_model.clone(),
                driver_name: config.driver_name.clone(),
                executor_name: config.executor_name.clone(),
            }),
        }
    }

    pub fn runs_directory(&self) -> &std::path::Path {
        self.shared.store.runs_directory()
    }

    /// Idempotent: returns the existing record unchanged if `run_id` is
    /// already known (spec.md §4.5 `submit`).
    pub fn submit(&self, request: SubmitRequest) -> Result<RunRecord, Error> {
        if let Ok(existing) = self.shared.store.get_run(&request.run_id) {
            return Ok(existing);
        }
        let timestamp = self.shared.clock.iso_now();
        self.shared.store.create(CreateRunRequest {
            run_id: request.run_id,
            program_path: request.program_path,
            driver: self.shared.driver_name.clone(),
            executor: self.shared.executor_name.clone(),
            status: RunStatus::Pending,
            metadata: request.metadata,
            timestamp,
        })
    }

    /// The core of the lifecycle (spec.md §4.5 `runSync`, steps 1-8).
    pub async fn run_sync(
        &self,
        request: RunSyncRequest,
        executor: &dyn ProgramExecutor,
    ) -> Result<(RunRecord, RunResult), Error> {
        let RunSyncRequest { run_id, program_path, metadata } = request;

        // Step 1: already terminal — return the stored outcome as-is.
        if let Ok(existing) = self.shared.store.get_run(&run_id) {
            if existing.status.is_terminal() {
                let result = self.shared.store.get_result(&run_id)?.ok_or_else(|| {
                    Error::persistence(
                        existing.paths.result_file.clone(),
                        "terminal run is missing result.json".to_string(),
                    )
                })?;
                return Ok((existing, result));
            }
        }

        // Steps 2-3: create as running, or transition pending -> running.
        let timestamp = self.shared.clock.iso_now();
        let run = match self.shared.store.get_run(&run_id) {
            Ok(existing) if existing.status == RunStatus::Pending => {
                self.shared.store.set_status(&run_id, RunStatus::Running, timestamp)?
            }
            Ok(existing) => existing,
            Err(_) => self.shared.store.create(CreateRunRequest {
                run_id: run_id.clone(),
                program_path: program_path.clone(),
                driver: self.shared.driver_name.clone(),
                executor: self.shared.executor_name.clone(),
                status: RunStatus::Running,
                metadata,
                timestamp,
            })?,
        };
        let run_directory = run.paths.run_dir.clone();

        // Step 4: seed lifecycle/sequence/spawn state from the existing log.
        let existing_events = self.shared.store.read_events(&run_id)?;
        replay(&existing_events)?;
        let spawn_count = existing_events
            .iter()
            .filter(|e| matches!(e.payload, EventPayload::SpawnStart { .. }))
            .count() as u64;
        let counter = Arc::new(SpawnCounter::starting_at(spawn_count));
        let spawns = Arc::new(Mutex::new(
            existing_events
                .iter()
                .filter_map(|e| match &e.payload {
                    EventPayload::SpawnComplete { result, .. } => Some(result.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        ));

        // Step 5: fresh run — setup hooks then run:start / run:status.
        if existing_events.is_empty() {
            let context =
                ExtensionContext { run_id: run_id.clone(), run_directory: run_directory.clone() };
            for extension in &self.shared.extensions {
                let Some(setup) = &extension.setup else { continue };
                if let Err(message) = setup.setup(&context).await {
                    let _ = self
                        .shared
                        .emit(&run_id, &run_directory, |_| EventPayload::ExtensionError {
                            extension_name: extension.name.clone(),
                            hook: ExtensionHook::Setup,
                            message,
                        })
                        .await;
                }
            }
            self.shared
                .emit(&run_id, &run_directory, |_| EventPayload::RunStart {
                    program_path: program_path.clone(),
                })
                .await?;
            self.shared
                .emit(&run_id, &run_directory, |_| EventPayload::RunStatus {
                    status: RunStatus::Running,
                })
                .await?;
        }

        // Step 6: hand control to the program host.
        let spawn_effect = SpawnEffect::new(
            Arc::clone(&self.shared),
            run_id.clone(),
            run_directory.clone(),
            counter,
            Arc::clone(&spawns),
        );
        let outcome =
            executor.execute(&run_id, &run_directory, &program_path, spawn_effect).await;
        let completed_at = self.shared.clock.iso_now();

        match outcome {
            // Step 7: success.
            Ok(program_result) => {
                let result = RunResult {
                    run_id: run_id.to_string(),
                    status: RunStatus::Complete,
                    started_at: run.created_at.clone(),
                    completed_at,
                    spawns: spawns.lock().clone(),
                    program_result,
                    error_message: None,
                };
                self.shared
                    .emit(&run_id, &run_directory, |_| EventPayload::RunComplete {
                        result: result.clone(),
                    })
                    .await?;
                let timestamp = self.shared.clock.iso_now();
                let updated = self.shared.store.set_result(&run_id, &result, timestamp)?;
                Ok((updated, result))
            }
            // Step 8: failure.
            Err(message) => {
                let result = RunResult {
                    run_id: run_id.to_string(),
                    status: RunStatus::Failed,
                    started_at: run.created_at.clone(),
                    completed_at,
                    spawns: spawns.lock().clone(),
                    program_result: None,
                    error_message: Some(message.clone()),
                };
                self.shared
                    .emit(&run_id, &run_directory, |_| EventPayload::RunFailed {
                        message: message.clone(),
                    })
                    .await?;
                let timestamp = self.shared.clock.iso_now();
                let _ = self.shared.store.set_result(&run_id, &result, timestamp);
                Err(Error::program_execution(run_id.to_string(), message))
            }
        }
    }

    pub fn status(&self, run_id: &RunId) -> Result<RunRecord, Error> {
        self.shared.store.get_run(run_id)
    }

    pub fn result(&self, run_id: &RunId) -> Result<Option<RunResult>, Error> {
        self.shared.store.get_result(run_id)
    }

    pub fn list(&self, status: Option<RunStatus>) -> Result<Vec<RunRecord>, Error> {
        self.shared.store.list_runs(status)
    }

    /// Poll the persisted run record at a fixed 25ms interval until it
    /// reaches a terminal status or `timeout` elapses (spec.md §5). Polls
    /// the store directly rather than the in-process hub so this works
    /// whether or not `wait` is invoked from the worker process that is
    /// actually running the program — see DESIGN.md.
    pub async fn wait(&self, run_id: &RunId, timeout: Duration) -> Result<RunRecord, Error> {
        const POLL_INTERVAL: Duration = Duration::from_millis(25);
        let start = tokio::time::Instant::now();
        loop {
            let record = self.shared.store.get_run(run_id)?;
            if record.status.is_terminal() {
                return Ok(record);
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(Error::WaitTimeout {
                    run_id: run_id.to_string(),
                    timeout_millis: timeout.as_millis() as u64,
                    message: format!(
                        "wait on run {run_id} timed out after {}ms",
                        timeout.as_millis()
                    ),
                });
            }
            tokio::time::sleep(POLL_INTERVAL.min(timeout - elapsed)).await;
        }
    }

    /// Backfill-then-live (spec.md §4.5 `watch`): all persisted events for
    /// `run_id` followed by the live per-run tier-1 stream from the hub.
    pub fn watch(&self, run_id: &RunId) -> Result<EventStream, Error> {
        self.shared.store.get_run(run_id)?;
        let backfill = self.shared.store.read_events(run_id)?;
        let live = self.shared.hub.subscribe_tier1(run_id);
        Ok(EventStream::new(backfill, Some(live)))
    }

    /// spec.md §4.5 `watchAll`: all persisted events across every run with
    /// `timestamp >= sinceTime`, totally ordered by `(timestamp, runId,
    /// sequence)`, followed by the live global stream filtered the same way.
    pub fn watch_all(&self, since_time: Option<String>) -> Result<GlobalEventStream, Error> {
        let since = match since_time {
            Some(raw) => {
                validate_since_time(&raw)?;
                raw
            }
            None => String::new(),
        };

        let mut backfill = Vec::new();
        for run_id in self.shared.store.list_run_ids()? {
            if let Ok(events) = self.shared.store.read_events(&run_id) {
                backfill.extend(events.into_iter().filter(|e| e.timestamp >= since));
            }
        }
        backfill.sort_by(|a, b| {
            (a.timestamp.as_str(), a.run_id.as_str(), a.sequence).cmp(&(
                b.timestamp.as_str(),
                b.run_id.as_str(),
                b.sequence,
            ))
        });

        let live = self.shared.hub.subscribe_tier1_global();
        Ok(GlobalEventStream::new(backfill, live, since))
    }

    /// spec.md §4.5 `watchIo`: the live tier-2 per-run stream. No backfill —
    /// tier-2 events are never persisted (spec.md §3).
    pub fn watch_io(&self, run_id: &RunId) -> Result<IoEventStream, Error> {
        self.shared.store.get_run(run_id)?;
        Ok(IoEventStream::new(self.shared.hub.subscribe_io(run_id)))
    }

    /// spec.md §4.5 `inspect`.
    pub fn inspect(
        &self,
        run_id: &RunId,
        spawn_id: Option<SpawnId>,
    ) -> Result<InspectResult, Error> {
        let run = self.shared.store.get_run(run_id)?;
        let events = self.shared.store.read_events(run_id)?;
        match spawn_id {
            None => {
                let result = self.shared.store.get_result(run_id)?;
                Ok(InspectResult::Run { run, events, result })
            }
            Some(spawn_id) => {
                let scoped: Vec<MillEvent> = events
                    .into_iter()
                    .filter(|e| e.payload.spawn_id() == Some(&spawn_id))
                    .collect();
                let result = scoped.iter().find_map(|e| match &e.payload {
                    EventPayload::SpawnComplete { result, .. } => Some(result.clone()),
                    _ => None,
                });
                Ok(InspectResult::Spawn { run_id: run_id.clone(), spawn_id, events: scoped, result })
            }
        }
    }

    /// spec.md §4.5 `cancel`: idempotent, races against a concurrently
    /// finalizing run are swallowed (spec.md §7).
    pub async fn cancel(
        &self,
        run_id: &RunId,
        reason: Option<String>,
    ) -> Result<(RunRecord, bool), Error> {
        let run = self.shared.store.get_run(run_id)?;
        if run.status.is_terminal() {
            return Ok((run, true));
        }

        let events = self.shared.store.read_events(run_id)?;
        let already_run_terminal = events.iter().any(|e| e.payload.run_terminal_kind().is_some());
        if !already_run_terminal {
            let _ = self
                .shared
                .emit(run_id, &run.paths.run_dir, |_| EventPayload::RunCancelled {
                    reason: reason.clone(),
                })
                .await;
        }

        let timestamp = self.shared.clock.iso_now();
        match self.shared.store.set_status(run_id, RunStatus::Cancelled, timestamp) {
            Ok(updated) => Ok((updated, false)),
            Err(_) => Ok((self.shared.store.get_run(run_id)?, false)),
        }
    }
}

/// spec.md §4.5 `watchAll`: `sinceTime` "must round-trip through a
/// parse-then-format equality check" against the same canonical rendering
/// every persisted timestamp uses (millisecond-precision RFC-3339, `Z`
/// suffix — see `mill_core::clock::epoch_ms_to_iso8601`).
fn validate_since_time(value: &str) -> Result<(), Error> {
    let parsed = chrono::DateTime::parse_from_rfc3339(value)
        .map_err(|e| Error::Config(format!("--since-time {value:?} is not ISO-8601: {e}")))?;
    let rendered =
        parsed.with_timezone(&chrono::Utc).to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    if rendered == value {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "--since-time {value:?} does not round-trip (canonical form is {rendered:?})"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::ExtensionRegistration;
    use async_trait::async_trait;
    use mill_core::{FakeClock, SpawnOptions};
    use mill_drivers::{DriverOutput, FakeDriver};
    use std::path::Path;
    use std::sync::Arc;

    fn config(dir: &Path) -> EngineConfig {
        EngineConfig::with_runs_directory(dir.to_path_buf())
    }

    struct OneSpawnProgram;

    #[async_trait]
    impl ProgramExecutor for OneSpawnProgram {
        async fn execute(
            &self,
            _run_id: &RunId,
            _run_directory: &Path,
            _program_path: &str,
            spawn: SpawnEffect,
        ) -> Result<Option<String>, String> {
            let result = spawn
                .spawn(SpawnOptions {
                    agent: "scout".into(),
                    system_prompt: "be concise".into(),
                    prompt: "hello".into(),
                    model: None,
                })
                .await
                .map_err(|e| e.to_string())?;
            Ok(Some(result.text))
        }
    }

    struct FailingProgram;

    #[async_trait]
    impl ProgramExecutor for FailingProgram {
        async fn execute(
            &self,
            _run_id: &RunId,
            _run_directory: &Path,
            _program_path: &str,
            _spawn: SpawnEffect,
        ) -> Result<Option<String>, String> {
            Err("program threw".to_string())
        }
    }

    fn engine_with_driver(dir: &Path, driver: Arc<FakeDriver>) -> Engine {
        Engine::new(&config(dir), driver, Vec::new(), Arc::new(FakeClock::new()))
    }

    #[tokio::test]
    async fn happy_path_emits_expected_event_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = Arc::new(FakeDriver::new());
        driver.queue_output(
            "scout",
            DriverOutput {
                result: serde_json::json!({
                    "text": "driver:hello",
                    "sessionRef": "session/scout",
                    "agent": "scout",
                    "model": "openai/gpt-5.3-codex",
                    "driver": "test",
                    "exitCode": 0,
                }),
                ..Default::default()
            },
        );
        let engine = engine_with_driver(tmp.path(), driver);
        let run_id = RunId::new();

        let (run, result) = engine
            .run_sync(
                RunSyncRequest {
                    run_id: run_id.clone(),
                    program_path: "/repo/program.ts".into(),
                    metadata: None,
                },
                &OneSpawnProgram,
            )
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Complete);
        assert_eq!(result.status, RunStatus::Complete);
        assert_eq!(result.spawns.len(), 1);
        assert_eq!(result.spawns[0].text, "driver:hello");

        let events = engine.shared.store.read_events(&run_id).unwrap();
        let kinds: Vec<&str> = events.iter().map(|e| e.payload.type_name()).collect();
        assert_eq!(
            kinds,
            vec![
                "run:start",
                "run:status",
                "spawn:start",
                "spawn:complete",
                "run:complete",
            ]
        );
    }

    #[tokio::test]
    async fn failed_program_emits_run_failed_and_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = Arc::new(FakeDriver::new());
        let engine = engine_with_driver(tmp.path(), driver);
        let run_id = RunId::new();

        let err = engine
            .run_sync(
                RunSyncRequest {
                    run_id: run_id.clone(),
                    program_path: "/repo/program.ts".into(),
                    metadata: None,
                },
                &FailingProgram,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProgramExecution { .. }));

        let run = engine.status(&run_id).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        let result = engine.result(&run_id).unwrap().unwrap();
        assert_eq!(result.error_message.as_deref(), Some("program threw"));
    }

    #[tokio::test]
    async fn wait_times_out_on_idle_running_run() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = Arc::new(FakeDriver::new());
        let engine = engine_with_driver(tmp.path(), driver);
        let run_id = RunId::new();
        engine
            .submit(SubmitRequest {
                run_id: run_id.clone(),
                program_path: "/repo/program.ts".into(),
                metadata: None,
            })
            .unwrap();
        engine.shared.store.set_status(&run_id, RunStatus::Running, "2026-01-01T00:00:00.000Z".into()).unwrap();

        let err = engine.wait(&run_id, Duration::from_millis(40)).await.unwrap_err();
        assert!(matches!(err, Error::WaitTimeout { .. }));
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = Arc::new(FakeDriver::new());
        let engine = engine_with_driver(tmp.path(), driver);
        let run_id = RunId::new();
        engine
            .submit(SubmitRequest {
                run_id: run_id.clone(),
                program_path: "/repo/program.ts".into(),
                metadata: None,
            })
            .unwrap();
        engine.shared.store.set_status(&run_id, RunStatus::Running, "2026-01-01T00:00:00.000Z".into()).unwrap();

        let (run, already_terminal) = engine.cancel(&run_id, Some("user requested".into())).await.unwrap();
        assert_eq!(run.status, RunStatus::Cancelled);
        assert!(!already_terminal);

        let (run_again, already_terminal_again) = engine.cancel(&run_id, None).await.unwrap();
        assert_eq!(run_again.status, RunStatus::Cancelled);
        assert!(already_terminal_again);
    }

    #[tokio::test]
    async fn cancel_of_a_pending_run_updates_status_to_match_the_log() {
        let tmp = tempfile::tempdir().unwrap();
        let driver = Arc::new(FakeDriver::new());
        let engine = engine_with_driver(tmp.path(), driver);
        let run_id = RunId::new();
        engine
            .submit(SubmitRequest {
                run_id: run_id.clone(),
                program_path: "/repo/program.ts".into(),
                metadata: None,
            })
            .unwrap();

        let (run, already_terminal) = engine.cancel(&run_id, None).await.unwrap();
        assert_eq!(run.status, RunStatus::Cancelled);
        assert!(!already_terminal);

        let events = engine.shared.store.read_events(&run_id).unwrap();
        assert!(events.iter().any(|e| matches!(e.payload, EventPayload::RunCancelled { .. })));
        let stored = engine.shared.store.get_run(&run_id).unwrap();
        assert_eq!(stored.status, RunStatus::Cancelled);
    }

    #[test]
    fn since_time_must_round_trip() {
        assert!(validate_since_time("2026-01-01T00:00:00.000Z").is_ok());
        assert!(validate_since_time("2026-01-01T00:00:00Z").is_err());
        assert!(validate_since_time("not-a-time").is_err());
    }
}
