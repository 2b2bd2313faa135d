// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use fs2::FileExt;
use mill_core::{
    decode_event, encode_event, replay, EventPayload, MillEvent, RunId, RunPaths, RunRecord,
    RunResult, RunStatus,
};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::PathBuf;

use mill_core::{apply_lifecycle_transition, ensure_run_status_transition, Error};

/// Fields needed to create a new run record (spec.md §4.2 `create`).
pub struct CreateRunRequest {
    pub run_id: RunId,
    pub program_path: String,
    pub driver: String,
    pub executor: String,
    pub status: RunStatus,
    pub metadata: Option<serde_json::Value>,
    pub timestamp: String,
}

/// The append-only run store: one instance per `runs_directory`.
///
/// Exclusively owns writes to each run directory (spec.md §3 Ownership).
/// Every append to `events.ndjson` takes an `fs2` exclusive advisory lock on
/// the file for the duration of the read-validate-append sequence, resolving
/// spec.md §9's first Open Question (serialize concurrent appenders rather
/// than silently allow a race).
#[derive(Debug, Clone)]
pub struct RunStore {
    runs_directory: PathBuf,
}

impl RunStore {
    pub fn new(runs_directory: PathBuf) -> Self {
        Self { runs_directory }
    }

    pub fn runs_directory(&self) -> &std::path::Path {
        &self.runs_directory
    }

    fn paths(&self, run_id: &str) -> RunPaths {
        RunPaths::for_run(&self.runs_directory, run_id)
    }

    /// Create a new run: creates `run_dir` recursively, writes `run.json`,
    /// creates an empty `events.ndjson`.
    pub fn create(&self, request: CreateRunRequest) -> Result<RunRecord, Error> {
        let paths = self.paths(request.run_id.as_str());
        std::fs::create_dir_all(&paths.run_dir)
            .map_err(|e| Error::persistence(&paths.run_dir, e.to_string()))?;

        let record = RunRecord {
            id: request.run_id.to_string(),
            status: request.status,
            program_path: request.program_path,
            driver: request.driver,
            executor: request.executor,
            created_at: request.timestamp.clone(),
            updated_at: request.timestamp,
            paths: paths.clone(),
            metadata: request.metadata,
        };
        self.write_record(&paths, &record)?;

        // Creating the file truncates any stale content, matching "creates
        // an empty events.ndjson" even if a prior run directory was reused.
        File::create(&paths.events_file)
            .map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;

        Ok(record)
    }

    fn write_record(&self, paths: &RunPaths, record: &RunRecord) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| Error::persistence(&paths.run_file, e.to_string()))?;
        std::fs::write(&paths.run_file, format!("{json}\n"))
            .map_err(|e| Error::persistence(&paths.run_file, e.to_string()))
    }

    /// Append one event with no sequence check (spec.md §4.2): the caller is
    /// responsible for sequence correctness. Used for raw replays/backfills;
    /// engine writes go through [`RunStore::append_checked`] instead.
    pub fn append_event(&self, run_id: &RunId, event: &MillEvent) -> Result<(), Error> {
        let paths = self.paths(run_id.as_str());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&paths.events_file)
            .map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;
        file.lock_exclusive()
            .map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;
        let mut line = encode_event(event).map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;
        line.push('\n');
        file.write_all(line.as_bytes())
            .map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;
        file.flush().ok();
        Ok(())
    }

    /// Atomically allocate the next sequence number, validate, and append a
    /// tier-1 event under one exclusive lock: this is the engine's "internal
    /// helper" from spec.md §4.5 — re-read persisted events, re-derive
    /// lifecycle state, allocate sequence, timestamp, validate, append.
    pub fn append_checked(
        &self,
        run_id: &RunId,
        timestamp: String,
        build: impl FnOnce(u64) -> EventPayload,
    ) -> Result<MillEvent, Error> {
        let paths = self.paths(run_id.as_str());
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&paths.events_file)
            .map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;
        file.lock_exclusive()
            .map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;

        let mut existing = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let event = decode_event(line)
                .map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;
            existing.push(event);
        }

        let guard_state = replay(&existing)?;
        let sequence = existing.last().map(|e| e.sequence + 1).unwrap_or(1);
        let payload = build(sequence);
        let event = MillEvent::new(run_id.clone(), sequence, timestamp, payload);
        apply_lifecycle_transition(&guard_state, &event)?;

        let mut line = encode_event(&event).map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;
        line.push('\n');
        file.write_all(line.as_bytes())
            .map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;
        file.flush().ok();

        Ok(event)
    }

    /// Decode every persisted event in order. Fails `RunNotFoundError` if
    /// `run.json` is missing; fails `PersistenceError` on a malformed line.
    pub fn read_events(&self, run_id: &RunId) -> Result<Vec<MillEvent>, Error> {
        let paths = self.paths(run_id.as_str());
        if !paths.run_file.exists() {
            return Err(Error::run_not_found(run_id.to_string()));
        }
        let contents = match std::fs::read_to_string(&paths.events_file) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::persistence(&paths.events_file, e.to_string())),
        };
        let mut events = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let event = decode_event(line)
                .map_err(|e| Error::persistence(&paths.events_file, e.to_string()))?;
            events.push(event);
        }
        Ok(events)
    }

    /// Validate and persist a status transition, rewriting `run.json`.
    pub fn set_status(
        &self,
        run_id: &RunId,
        status: RunStatus,
        timestamp: String,
    ) -> Result<RunRecord, Error> {
        let paths = self.paths(run_id.as_str());
        let mut record = self.get_run(run_id)?;
        ensure_run_status_transition(record.status, status)
            .map_err(|e| Error::lifecycle_invariant(run_id.to_string(), e.to_string()))?;
        record.status = status;
        record.updated_at = timestamp;
        self.write_record(&paths, &record)?;
        Ok(record)
    }

    /// Write `result.json` once, then transition the run's status to
    /// `result.status` via [`RunStore::set_status`].
    pub fn set_result(
        &self,
        run_id: &RunId,
        result: &RunResult,
        timestamp: String,
    ) -> Result<RunRecord, Error> {
        let paths = self.paths(run_id.as_str());
        let json = serde_json::to_string_pretty(result)
            .map_err(|e| Error::persistence(&paths.result_file, e.to_string()))?;
        std::fs::write(&paths.result_file, format!("{json}\n"))
            .map_err(|e| Error::persistence(&paths.result_file, e.to_string()))?;
        self.set_status(run_id, result.status, timestamp)
    }

    pub fn get_run(&self, run_id: &RunId) -> Result<RunRecord, Error> {
        let paths = self.paths(run_id.as_str());
        let text = std::fs::read_to_string(&paths.run_file)
            .map_err(|_| Error::run_not_found(run_id.to_string()))?;
        serde_json::from_str(&text).map_err(|e| Error::persistence(&paths.run_file, e.to_string()))
    }

    pub fn get_result(&self, run_id: &RunId) -> Result<Option<RunResult>, Error> {
        let paths = self.paths(run_id.as_str());
        match std::fs::read_to_string(&paths.result_file) {
            Ok(text) => {
                let result = serde_json::from_str(&text)
                    .map_err(|e| Error::persistence(&paths.result_file, e.to_string()))?;
                Ok(Some(result))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::persistence(&paths.result_file, e.to_string())),
        }
    }

    /// Enumerate direct children of `runs_directory`. Entries that fail to
    /// decode are silently skipped (spec.md §4.2). Sorted by `createdAt`
    /// descending, filtered by `status` if given.
    pub fn list_runs(&self, status: Option<RunStatus>) -> Result<Vec<RunRecord>, Error> {
        let entries = match std::fs::read_dir(&self.runs_directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::persistence(&self.runs_directory, e.to_string())),
        };

        let mut records = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let Some(name) = entry.file_name().to_str().map(str::to_string) else { continue };
            let Ok(record) = self.get_run(&RunId::from_string(name)) else { continue };
            if status.map_or(true, |s| record.status == s) {
                records.push(record);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// All run ids currently present under `runs_directory`, used by
    /// `watchAll`'s cross-run backfill (mill-engine owns the sort).
    pub fn list_run_ids(&self) -> Result<Vec<RunId>, Error> {
        let entries = match std::fs::read_dir(&self.runs_directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::persistence(&self.runs_directory, e.to_string())),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            if let Some(name) = entry.file_name().to_str() {
                ids.push(RunId::from_string(name.to_string()));
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
