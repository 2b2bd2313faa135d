// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C7: the detached worker. Invoked as the hidden `mill _worker` subcommand
//! (not a separate binary — see DESIGN.md for why), it owns the
//! process-scoped execution of exactly one run: write `worker.pid`, re-enter
//! the engine, drive the run to a terminal state exactly once, and remove
//! `worker.pid` on every exit path (spec.md §4.8).

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod env;

use std::path::PathBuf;
use std::sync::Arc;

use mill_bridge::{BridgeConfig, SubprocessProgramExecutor};
use mill_core::{Clock, EngineConfig, Error, RunId, RunPaths, RunRecord, RunResult, SystemClock};
use mill_drivers::{DriverRuntime, LocalDriver, RemoteDriver};
use mill_engine::{Engine, ProgramExecutor, RunSyncRequest, SubmitRequest};
use mill_registry::{Registration, Registry, RegistryKind};
use tracing::{error, info, warn};

/// Arguments the `_worker` subcommand parses and hands to [`run_worker`]
/// (spec.md §6 `_worker --run-id --program --runs-dir --driver --executor`).
pub struct WorkerArgs {
    pub run_id: RunId,
    pub program_path: String,
    pub runs_directory: PathBuf,
    pub driver_name: Option<String>,
    pub executor_name: Option<String>,
}

/// Run one worker to completion: idempotent finalizer for `args.run_id`.
/// Returns the run's final record and result whether this invocation did the
/// work or merely observed an already-terminal run left by a prior attempt
/// (spec.md §8 property 6 "idempotent worker").
pub async fn run_worker(args: WorkerArgs) -> Result<(RunRecord, RunResult), Error> {
    let paths = RunPaths::for_run(&args.runs_directory, args.run_id.as_str());
    std::fs::create_dir_all(paths.logs_dir())
        .map_err(|e| Error::persistence(paths.logs_dir(), e.to_string()))?;
    let _log_guard = init_worker_logging(&paths.logs_dir());
    let _pid_guard = PidFileGuard::write(paths.worker_pid_file())?;

    let mut config = EngineConfig::with_runs_directory(args.runs_directory.clone());
    if let Some(driver_name) = &args.driver_name {
        config.driver_name = driver_name.clone();
    }
    if let Some(executor_name) = &args.executor_name {
        config.executor_name = executor_name.clone();
    }

    let driver = resolve_driver(&config.driver_name)?;
    let executor = resolve_executor(&config.executor_name)?;

    let engine = Engine::new(&config, driver, Vec::new(), Arc::new(SystemClock) as Arc<dyn Clock>);

    info!(run_id = %args.run_id, "worker starting");

    let submitted = engine.submit(SubmitRequest {
        run_id: args.run_id.clone(),
        program_path: args.program_path.clone(),
        metadata: None,
    })?;

    if submitted.status.is_terminal() {
        warn!(run_id = %args.run_id, status = ?submitted.status, "worker:terminal-noop");
        let result = engine.result(&args.run_id)?.ok_or_else(|| {
            Error::persistence(paths.result_file.clone(), "terminal run is missing result.json".to_string())
        })?;
        return Ok((submitted, result));
    }

    let outcome = engine
        .run_sync(
            RunSyncRequest {
                run_id: args.run_id.clone(),
                program_path: args.program_path.clone(),
                metadata: None,
            },
            executor.as_ref(),
        )
        .await;

    match outcome {
        Ok((run, result)) => {
            info!(run_id = %args.run_id, "worker:complete");
            Ok((run, result))
        }
        Err(err) => {
            error!(run_id = %args.run_id, message = %err, "worker:failed");
            Err(err)
        }
    }
}

fn resolve_driver(driver_name: &str) -> Result<Arc<dyn DriverRuntime>, Error> {
    let registry: Registry<Arc<dyn DriverRuntime>> = Registry::new(
        RegistryKind::Driver,
        vec![
            Registration::new(
                "local",
                Arc::new(LocalDriver::new(env::local_driver_command())) as Arc<dyn DriverRuntime>,
            ),
            Registration::new(
                "remote",
                Arc::new(RemoteDriver::new(env::remote_driver_endpoint())) as Arc<dyn DriverRuntime>,
            ),
        ],
        "local",
    );
    Ok(Arc::clone(registry.resolve(Some(driver_name))?.runtime))
}

fn resolve_executor(executor_name: &str) -> Result<Arc<dyn ProgramExecutor>, Error> {
    let registry: Registry<Arc<dyn ProgramExecutor>> = Registry::new(
        RegistryKind::Executor,
        vec![Registration::new(
            "local",
            Arc::new(SubprocessProgramExecutor::new(BridgeConfig {
                runtime_command: env::executor_runtime_command(),
            })) as Arc<dyn ProgramExecutor>,
        )],
        "local",
    );
    Ok(Arc::clone(registry.resolve(Some(executor_name))?.runtime))
}

/// Installs a tracing subscriber writing to `<runDir>/logs/worker.log`
/// through a non-blocking appender (spec.md §6 `logs/worker.log`, SPEC_FULL
/// §10.2). Every span in this process carries `run_id` as a field. The
/// returned guard must be held for the worker's lifetime or buffered lines
/// are dropped on exit.
fn init_worker_logging(logs_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(logs_dir, "worker.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();
    // A worker process owns exactly one run and is never re-entered with a
    // different global subscriber, so a failed `set_global_default` (e.g. in
    // a test harness that already installed one) is not fatal.
    let _ = tracing::subscriber::set_global_default(subscriber);
    guard
}

struct PidFileGuard {
    path: PathBuf,
}

impl PidFileGuard {
    fn write(path: PathBuf) -> Result<Self, Error> {
        std::fs::write(&path, format!("{}\n", std::process::id()))
            .map_err(|e| Error::persistence(&path, e.to_string()))?;
        Ok(Self { path })
    }
}

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mill_drivers::{DriverOutput, FakeDriver};

    fn fake_driver_with_happy_result() -> Arc<FakeDriver> {
        let driver = Arc::new(FakeDriver::new());
        driver.queue_output(
            "scout",
            DriverOutput {
                result: serde_json::json!({
                    "text": "hello",
                    "sessionRef": "session/scout",
                    "agent": "scout",
                    "model": "default",
                    "driver": "test",
                    "exitCode": 0,
                }),
                ..Default::default()
            },
        );
        driver
    }

    #[test]
    fn worker_args_carry_explicit_flags() {
        let args = WorkerArgs {
            run_id: RunId::from_string("run_abc"),
            program_path: "/repo/program.ts".into(),
            runs_directory: PathBuf::from("/tmp/mill/runs"),
            driver_name: Some("local".into()),
            executor_name: Some("local".into()),
        };
        assert_eq!(args.run_id.as_str(), "run_abc");
        let _ = fake_driver_with_happy_result();
    }

    #[test]
    fn resolve_driver_rejects_unknown_name() {
        let err = resolve_driver("bogus").unwrap_err();
        assert!(matches!(err, Error::DriverRegistry { .. }));
    }

    #[test]
    fn resolve_executor_rejects_unknown_name() {
        let err = resolve_executor("bogus").unwrap_err();
        assert!(matches!(err, Error::ExecutorRegistry { .. }));
    }
}
