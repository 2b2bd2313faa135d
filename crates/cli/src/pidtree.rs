// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancel-by-pid-tree (spec.md §4.9 step 3): read `worker.pid`, walk `/proc`
//! to find the worker's descendants, verify each pid's command line before
//! touching it, then SIGTERM, wait out a grace period, and SIGKILL any
//! survivor. No teacher precedent for process-tree signalling exists in the
//! pack; this is built directly against spec.md's description using `nix`,
//! a dependency the workspace already carries.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const GRACE_PERIOD: Duration = Duration::from_millis(400);

/// Read the pid recorded by a run's worker, if the file exists and parses.
pub fn read_worker_pid(pid_file: &Path) -> Option<i32> {
    fs::read_to_string(pid_file).ok()?.trim().parse().ok()
}

pub fn pid_alive(pid: i32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

/// `/proc/<pid>/cmdline` is NUL-separated argv; render it space-joined for
/// substring matching against the expected `_worker --run-id <id>` shape.
fn cmdline(pid: i32) -> Option<String> {
    let raw = fs::read(format!("/proc/{pid}/cmdline")).ok()?;
    Some(
        raw.split(|b| *b == 0)
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

/// Verify `pid` actually looks like the worker launched for `run_id` before
/// it is ever signalled, so a pid reused by an unrelated process is never
/// touched (spec.md §4.9 step 3).
pub fn looks_like_our_worker(pid: i32, run_id: &str) -> bool {
    cmdline(pid)
        .map(|line| line.contains("_worker") && line.contains(&format!("--run-id {run_id}")))
        .unwrap_or(false)
}

fn parent_pid(pid: i32) -> Option<i32> {
    let stat = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    // `comm` (field 2) is parenthesized and may itself contain spaces or
    // parens; the remaining fields start right after its closing paren.
    let after_comm = stat.rsplit_once(')')?.1;
    after_comm.split_whitespace().nth(1)?.parse().ok()
}

fn all_pids() -> Vec<i32> {
    let Ok(entries) = fs::read_dir("/proc") else { return Vec::new() };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().to_str()?.parse::<i32>().ok())
        .collect()
}

fn children_map() -> HashMap<i32, Vec<i32>> {
    let mut map: HashMap<i32, Vec<i32>> = HashMap::new();
    for pid in all_pids() {
        if let Some(parent) = parent_pid(pid) {
            map.entry(parent).or_default().push(pid);
        }
    }
    map
}

/// `root` plus every live descendant, from a single `/proc` snapshot.
fn descendants(root: i32) -> Vec<i32> {
    let children = children_map();
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    let mut tree = Vec::new();
    while let Some(pid) = stack.pop() {
        if !seen.insert(pid) {
            continue;
        }
        tree.push(pid);
        if let Some(kids) = children.get(&pid) {
            stack.extend(kids.iter().copied());
        }
    }
    tree
}

/// SIGTERM the worker and its descendants, wait out the grace period, then
/// SIGKILL any survivor. Returns the pids actually signalled (for logging).
/// No-op if `root_pid` no longer looks like our worker.
pub fn terminate_tree(root_pid: i32, run_id: &str) -> Vec<i32> {
    if !looks_like_our_worker(root_pid, run_id) {
        return Vec::new();
    }
    let tree = descendants(root_pid);
    let mut signalled = Vec::new();
    for pid in &tree {
        if kill(Pid::from_raw(*pid), Signal::SIGTERM).is_ok() {
            signalled.push(*pid);
        }
    }
    std::thread::sleep(GRACE_PERIOD);
    for pid in &tree {
        if pid_alive(*pid) {
            let _ = kill(Pid::from_raw(*pid), Signal::SIGKILL);
        }
    }
    signalled
}

/// Path to the run's cancel log, creating `logs/` if needed.
pub fn cancel_log_path(logs_dir: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(logs_dir)?;
    Ok(logs_dir.join("cancel.log"))
}
