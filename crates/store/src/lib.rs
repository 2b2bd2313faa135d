// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mill-store: the append-only run store (spec.md §4.2).
//!
//! Layout under `<runs_directory>/<run_id>/`: `run.json` (overwritten on every
//! status/metadata change), `events.ndjson` (append-only, advisory-locked),
//! `result.json` (written once at finalization). `logs/`, `worker.pid`,
//! `program.ts` and the program-host bootstrap files are written by callers
//! (mill-worker, mill-cli, mill-bridge) directly under the paths this crate
//! derives via [`mill_core::RunPaths`], not by this crate.

mod store;

pub use store::{CreateRunRequest, RunStore};
