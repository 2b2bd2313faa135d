// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mill watch`: stream events for one run or across all runs (spec.md §4.5
//! `watch`/`watchAll`, §6). Cross-process, so this tails `events.ndjson`
//! files directly with `notify` rather than subscribing to the in-process
//! observer hub a worker would use — grounded on the teacher's
//! `crates/cli/src/output.rs` file-tailing helper. Tier-2 I/O (`--channel
//! io`/`all`) genuinely cannot be observed this way: the hub is strictly
//! in-process (spec.md §5), so that channel is refused rather than faked.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use mill_core::{decode_event, MillEvent, RunId, RunPaths, SpawnId};
use mill_store::RunStore;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    run: Option<String>,
    since_time: Option<String>,
    channel: String,
    source: Option<String>,
    spawn: Option<String>,
    format: OutputFormat,
) -> Result<(), ExitError> {
    let _ = source; // tier-1 MillEvent carries no `source`; only meaningful for the unsupported io channel
    if let Some(since) = &since_time {
        validate_since_time(since)?;
    }
    if matches!(channel.as_str(), "io" | "all") && run.is_none() {
        return Err(ExitError::new(1, "--channel io/all require --run"));
    }
    if channel == "io" {
        return Err(ExitError::new(
            1,
            "watch --channel io cannot be observed from a separate process: the observer hub \
             is in-process only (spec.md §5); use --channel events",
        ));
    }
    if channel == "all" {
        eprintln!(
            "warning: tier-2 io events are in-process only and will not be shown; \
             streaming tier-1 events only"
        );
    }

    let config = crate::config::resolve(None)?;
    let store = RunStore::new(config.runs_directory);
    let since = since_time.unwrap_or_default();
    let spawn_filter = spawn.map(SpawnId::from_string);

    match run {
        Some(run_id) => watch_one(&store, RunId::from_string(run_id), &since, &spawn_filter, format).await,
        None => watch_all(&store, &since, &spawn_filter, format).await,
    }
}

async fn watch_one(
    store: &RunStore,
    run_id: RunId,
    since: &str,
    spawn_filter: &Option<SpawnId>,
    format: OutputFormat,
) -> Result<(), ExitError> {
    let run = store.get_run(&run_id)?;
    let mut tail =
        FileTail::new(run.paths.events_file.clone()).map_err(|e| ExitError::new(1, e.to_string()))?;

    for line in tail.read_new_lines().map_err(|e| ExitError::new(1, e.to_string()))? {
        if let Ok(event) = decode_event(&line) {
            let terminal = event.payload.run_terminal_kind().is_some();
            emit(&event, since, spawn_filter, format)?;
            if terminal {
                return Ok(());
            }
        }
    }
    if run.status.is_terminal() {
        return Ok(());
    }

    loop {
        tail.wait_for_change();
        for line in tail.read_new_lines().map_err(|e| ExitError::new(1, e.to_string()))? {
            if let Ok(event) = decode_event(&line) {
                let terminal = event.payload.run_terminal_kind().is_some();
                emit(&event, since, spawn_filter, format)?;
                if terminal {
                    return Ok(());
                }
            }
        }
    }
}

/// Runs forever (like `tail -f` across every run directory) — `watchAll` has
/// no single terminal event to close on, so the caller interrupts it.
async fn watch_all(
    store: &RunStore,
    since: &str,
    spawn_filter: &Option<SpawnId>,
    format: OutputFormat,
) -> Result<(), ExitError> {
    let runs_directory = store.runs_directory().to_path_buf();
    std::fs::create_dir_all(&runs_directory)?;
    let dir_watch =
        DirWatcher::new(runs_directory.clone()).map_err(|e| ExitError::new(1, e.to_string()))?;
    let mut tails: HashMap<RunId, FileTail> = HashMap::new();

    loop {
        for run_id in store.list_run_ids()? {
            if tails.contains_key(&run_id) {
                continue;
            }
            let paths = RunPaths::for_run(&runs_directory, run_id.as_str());
            if let Ok(tail) = FileTail::new(paths.events_file) {
                tails.insert(run_id, tail);
            }
        }

        let mut batch: Vec<MillEvent> = Vec::new();
        for tail in tails.values_mut() {
            for line in tail.read_new_lines().unwrap_or_default() {
                if let Ok(event) = decode_event(&line) {
                    batch.push(event);
                }
            }
        }
        batch.sort_by(|a, b| {
            (a.timestamp.as_str(), a.run_id.as_str(), a.sequence).cmp(&(
                b.timestamp.as_str(),
                b.run_id.as_str(),
                b.sequence,
            ))
        });
        for event in &batch {
            emit(event, since, spawn_filter, format)?;
        }

        dir_watch.wait_for_change();
    }
}

fn emit(
    event: &MillEvent,
    since: &str,
    spawn_filter: &Option<SpawnId>,
    format: OutputFormat,
) -> Result<(), ExitError> {
    if !since.is_empty() && event.timestamp.as_str() < since {
        return Ok(());
    }
    if let Some(filter) = spawn_filter {
        if event.payload.spawn_id() != Some(filter) {
            return Ok(());
        }
    }
    output::print_event(format, event)?;
    Ok(())
}

fn validate_since_time(value: &str) -> Result<(), ExitError> {
    let parsed = chrono::DateTime::parse_from_rfc3339(value)
        .map_err(|e| ExitError::new(1, format!("--since-time {value:?} is not ISO-8601: {e}")))?;
    let rendered =
        parsed.with_timezone(&chrono::Utc).to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    if rendered == value {
        Ok(())
    } else {
        Err(ExitError::new(
            1,
            format!("--since-time {value:?} does not round-trip (canonical form is {rendered:?})"),
        ))
    }
}

/// Tails one NDJSON file by re-reading it and skipping lines already
/// emitted — simpler and race-free compared to tracking a byte offset
/// across the backfill/live boundary.
struct FileTail {
    path: PathBuf,
    emitted: usize,
    _watcher: RecommendedWatcher,
    rx: std_mpsc::Receiver<notify::Result<notify::Event>>,
}

impl FileTail {
    fn new(path: PathBuf) -> notify::Result<Self> {
        let (tx, rx) = std_mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)?;
        if let Some(parent) = path.parent() {
            let _ = watcher.watch(parent, RecursiveMode::NonRecursive);
        }
        Ok(Self { path, emitted: 0, _watcher: watcher, rx })
    }

    fn read_new_lines(&mut self) -> std::io::Result<Vec<String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        let lines: Vec<&str> = contents.lines().filter(|line| !line.trim().is_empty()).collect();
        let start = self.emitted.min(lines.len());
        let fresh = lines[start..].iter().map(|line| line.to_string()).collect();
        self.emitted = lines.len();
        Ok(fresh)
    }

    fn wait_for_change(&self) {
        wait_on(&self.rx);
    }
}

struct DirWatcher {
    _watcher: RecommendedWatcher,
    rx: std_mpsc::Receiver<notify::Result<notify::Event>>,
}

impl DirWatcher {
    fn new(dir: PathBuf) -> notify::Result<Self> {
        let (tx, rx) = std_mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)?;
        watcher.watch(&dir, RecursiveMode::Recursive)?;
        Ok(Self { _watcher: watcher, rx })
    }

    fn wait_for_change(&self) {
        wait_on(&self.rx);
    }
}

/// Block the current worker thread up to 200ms for a filesystem event, off
/// the async executor (`block_in_place` requires the multi-threaded runtime
/// `mill`'s `#[tokio::main]` already uses).
fn wait_on(rx: &std_mpsc::Receiver<notify::Result<notify::Event>>) {
    tokio::task::block_in_place(|| {
        let _ = rx.recv_timeout(Duration::from_millis(200));
    });
}
