// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mill run`: the submission façade (spec.md §4.9 `submitRun`).

use std::path::PathBuf;
use std::process::Stdio;

use mill_core::{Clock, RunId, RunStatus, SystemClock};
use mill_store::{CreateRunRequest, RunStore};

use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    program_path: PathBuf,
    sync: bool,
    driver: Option<String>,
    executor: Option<String>,
    runs_dir: Option<PathBuf>,
    meta_json: Option<String>,
    format: OutputFormat,
) -> Result<(), ExitError> {
    let config = crate::config::resolve(runs_dir)?;
    let observed_depth = crate::config::observed_run_depth();
    config.check_recursion_depth(observed_depth)?;

    let absolute_program_path = std::fs::canonicalize(&program_path).map_err(|_| {
        ExitError::new(1, format!("program not found: {}", program_path.display()))
    })?;

    let metadata = meta_json
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e: serde_json::Error| ExitError::new(1, format!("--meta-json: {e}")))?;

    let run_id = RunId::new();
    let driver_name = driver.unwrap_or_else(|| config.driver_name.clone());
    let executor_name = executor.unwrap_or_else(|| config.executor_name.clone());

    let store = RunStore::new(config.runs_directory.clone());
    let timestamp = SystemClock.iso_now();
    let record = store.create(CreateRunRequest {
        run_id: run_id.clone(),
        program_path: absolute_program_path.display().to_string(),
        driver: driver_name.clone(),
        executor: executor_name.clone(),
        status: RunStatus::Pending,
        metadata,
        timestamp,
    })?;

    // spec.md §4.9 step 4: copy the program source, create logs/, touch
    // worker.log before the worker is ever launched.
    std::fs::create_dir_all(record.paths.logs_dir())?;
    std::fs::copy(&absolute_program_path, record.paths.program_copy_file())?;
    std::fs::File::create(record.paths.logs_dir().join("worker.log"))?;

    launch_worker(&run_id, &absolute_program_path, &config.runs_directory, &driver_name, &executor_name)?;

    if sync {
        let terminal = super::wait::poll_until_terminal(&store, &run_id, None).await?;
        output::format_or_json(format, &terminal, || {
            println!("{} {}", terminal.id, terminal.status);
        })?;
    } else {
        output::format_or_json(format, &record, || println!("{}", record.id))?;
    }
    Ok(())
}

/// Spawn the detached worker (spec.md §4.9 step 5): `mill _worker ...`,
/// inheriting a one-higher `MILL_RUN_DEPTH` (spec.md §5).
fn launch_worker(
    run_id: &RunId,
    program_path: &std::path::Path,
    runs_directory: &std::path::Path,
    driver_name: &str,
    executor_name: &str,
) -> Result<(), ExitError> {
    let exe = std::env::current_exe()?;
    let mut command = std::process::Command::new(exe);
    command
        .arg("_worker")
        .arg("--run-id")
        .arg(run_id.as_str())
        .arg("--program")
        .arg(program_path)
        .arg("--runs-dir")
        .arg(runs_directory)
        .arg("--driver")
        .arg(driver_name)
        .arg("--executor")
        .arg(executor_name)
        .env("MILL_RUN_DEPTH", crate::config::next_run_depth().to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group so `cancel`'s pid-tree walk can find every
        // descendant without also reaching back up into the CLI itself.
        command.process_group(0);
    }

    command
        .spawn()
        .map_err(|e| ExitError::new(1, format!("failed to launch worker: {e}")))?;
    Ok(())
}
