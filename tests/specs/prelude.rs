//! Test helpers for black-box `mill` CLI specifications.
//!
//! Every other subcommand (`status`/`wait`/`watch`/`cancel`/`ls`/`inspect`)
//! resolves its runs directory from `$HOME/.mill/runs` (spec.md §4.9 step
//! 1) — there is no per-invocation `--runs-dir` override outside `run`/
//! `_worker`. [`Project`] therefore points `$HOME` at a scratch directory
//! rather than passing a flag, and seeds fixture runs directly through
//! `mill-store` so these specs never depend on an external driver or
//! program-host runtime being installed on the test machine.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use mill_core::Clock;
use mill_core::{EventPayload, RunId, RunResult, RunStatus, SystemClock};
use mill_store::{CreateRunRequest, RunStore};

/// Resolve the compiled `mill` binary, trying the standard debug target dir
/// first and falling back to the test binary's own neighbor directory (the
/// llvm-cov harness and workspace-root test runners both build there).
fn binary_path() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug/mill");
    if standard.exists() {
        return standard;
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join("mill");
            if fallback.exists() {
                return fallback;
            }
        }
    }
    standard
}

pub struct CliBuilder {
    args: Vec<String>,
    home: PathBuf,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new(home: PathBuf) -> Self {
        Self { args: Vec::new(), home, envs: Vec::new() }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    fn command(self) -> Command {
        let mut cmd = Command::new(binary_path());
        cmd.args(&self.args);
        cmd.env("HOME", &self.home);
        // Never let a developer's real MILL_RUN_DEPTH leak into a test that
        // expects a fresh top-level submission.
        cmd.env_remove("MILL_RUN_DEPTH");
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    pub fn run(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("mill should run");
        RunAssert { output }
    }

    pub fn passes(self) -> RunAssert {
        let result = self.run();
        assert!(
            result.output.status.success(),
            "expected success, got exit code {:?}\nstdout: {}\nstderr: {}",
            result.output.status.code(),
            result.stdout(),
            result.stderr(),
        );
        result
    }

    pub fn fails(self) -> RunAssert {
        let result = self.run();
        assert!(
            !result.output.status.success(),
            "expected failure, but it passed\nstdout: {}",
            result.stdout(),
        );
        result
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain {expected:?}\nstdout: {stdout}");
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr does not contain {expected:?}\nstderr: {stderr}");
        self
    }

    pub fn code_is(self, expected: i32) -> Self {
        assert_eq!(self.code(), Some(expected));
        self
    }
}

/// A scratch `$HOME` (so `$HOME/.mill/runs` is isolated per test) plus the
/// [`RunStore`] used to seed fixture runs directly, bypassing the
/// worker/driver/program-host chain entirely.
pub struct Project {
    home: tempfile::TempDir,
    store: RunStore,
}

impl Project {
    pub fn empty() -> Self {
        let home = tempfile::tempdir().expect("tempdir");
        let runs_dir = home.path().join(".mill").join("runs");
        std::fs::create_dir_all(&runs_dir).expect("create runs dir");
        let store = RunStore::new(runs_dir);
        Self { home, store }
    }

    pub fn store(&self) -> &RunStore {
        &self.store
    }

    pub fn home_path(&self) -> &Path {
        self.home.path()
    }

    /// Build a `mill` invocation scoped to this project's `$HOME`.
    pub fn mill(&self) -> CliBuilder {
        CliBuilder::new(self.home.path().to_path_buf())
    }

    /// Seed a run directly through the store: `create` plus whatever events
    /// the caller appends afterwards.
    pub fn seed_run(&self, run_id: &RunId, status: RunStatus) {
        self.store
            .create(CreateRunRequest {
                run_id: run_id.clone(),
                program_path: "/repo/program.ts".to_string(),
                driver: "local".to_string(),
                executor: "local".to_string(),
                status,
                metadata: None,
                timestamp: SystemClock.iso_now(),
            })
            .expect("seed run");
    }

    pub fn append(&self, run_id: &RunId, payload: EventPayload) {
        let timestamp = SystemClock.iso_now();
        self.store.append_checked(run_id, timestamp, |_sequence| payload).expect("append event");
    }

    pub fn set_result(&self, run_id: &RunId, result: &RunResult) {
        let timestamp = SystemClock.iso_now();
        self.store.set_result(run_id, result, timestamp).expect("set result");
    }
}
