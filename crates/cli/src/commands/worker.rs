// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mill _worker`: the hidden entry point of the detached worker process
//! (spec.md §6 `_worker`, §4.8). A thin wrapper over `mill_worker::run_worker`
//! — see DESIGN.md for why this subcommand, rather than a separate
//! `mill-worker` binary, is C7's process entry point.

use std::path::PathBuf;

use mill_core::RunId;
use mill_worker::{run_worker, WorkerArgs};

use crate::exit_error::ExitError;

pub async fn execute(
    run_id: String,
    program: String,
    runs_dir: PathBuf,
    driver: Option<String>,
    executor: Option<String>,
) -> Result<(), ExitError> {
    run_worker(WorkerArgs {
        run_id: RunId::from_string(run_id),
        program_path: program,
        runs_directory: runs_dir,
        driver_name: driver,
        executor_name: executor,
    })
    .await?;
    Ok(())
}
