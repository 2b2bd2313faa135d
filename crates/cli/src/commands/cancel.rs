// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mill cancel`: idempotent (spec.md §4.9 `cancelRun`, §4.5 `cancel`).
//! Reimplements `Engine::cancel`'s exact logic directly against the store,
//! then walks and signals the worker's pid tree, logging every step to
//! `<runDir>/logs/cancel.log`.

use std::io::Write;

use mill_core::{Clock, EventPayload, RunId, RunStatus, SystemClock};
use mill_store::RunStore;
use serde::Serialize;

use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};
use crate::pidtree;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelOutcome {
    #[serde(flatten)]
    run: mill_core::RunRecord,
    already_terminal: bool,
}

pub fn execute(run_id: String, format: OutputFormat) -> Result<(), ExitError> {
    let config = crate::config::resolve(None)?;
    let store = RunStore::new(config.runs_directory);
    let run_id = RunId::from_string(run_id);

    let run = store.get_run(&run_id)?;
    let mut log = CancelLog::open(&run.paths.logs_dir())?;

    let (record, already_terminal) = if run.status.is_terminal() {
        (run, true)
    } else {
        let events = store.read_events(&run_id)?;
        let already_run_terminal = events.iter().any(|e| e.payload.run_terminal_kind().is_some());
        if !already_run_terminal {
            let timestamp = SystemClock.iso_now();
            let _ = store.append_checked(&run_id, timestamp, |_sequence| {
                EventPayload::RunCancelled { reason: Some("user requested".to_string()) }
            });
        }
        let timestamp = SystemClock.iso_now();
        let updated = match store.set_status(&run_id, RunStatus::Cancelled, timestamp) {
            Ok(updated) => updated,
            Err(_) => store.get_run(&run_id)?,
        };
        (updated, false)
    };
    log.line(&format!("cancel:status run_id={run_id} already_terminal={already_terminal}"));

    let pid_file = record.paths.worker_pid_file();
    match pidtree::read_worker_pid(&pid_file) {
        None => log.line("cancel:kill skipped reason=no-worker-pid"),
        Some(pid) => {
            if !pidtree::looks_like_our_worker(pid, run_id.as_str()) {
                log.line(&format!("cancel:kill skipped reason=pid-mismatch pid={pid}"));
            } else {
                let signalled = pidtree::terminate_tree(pid, run_id.as_str());
                log.line(&format!("cancel:kill pid={pid} signalled={}", signalled.len()));
                if !pidtree::pid_alive(pid) {
                    let _ = std::fs::remove_file(&pid_file);
                }
            }
        }
    }

    output::format_or_json(format, &CancelOutcome { run: record.clone(), already_terminal }, || {
        println!("{} {} alreadyTerminal={}", record.id, record.status, already_terminal);
    })?;
    Ok(())
}

struct CancelLog(std::fs::File);

impl CancelLog {
    fn open(logs_dir: &std::path::Path) -> Result<Self, ExitError> {
        let path = pidtree::cancel_log_path(logs_dir)?;
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self(file))
    }

    fn line(&mut self, message: &str) {
        let _ = writeln!(self.0, "{} {message}", SystemClock.iso_now());
    }
}
