// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mill wait`: block until a run reaches a terminal status or the timeout
//! elapses (spec.md §4.5 `wait`, §5). Reimplements `Engine::wait`'s exact
//! 25ms poll loop directly against the store rather than constructing an
//! `Engine` — this CLI talks to runs only through the store and a worker
//! process (see crates/engine/src/lib.rs's doc comment, and DESIGN.md).

use std::time::Duration;

use mill_core::{Error, RunId, RunRecord};
use mill_store::RunStore;

use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};

pub async fn execute(run_id: String, timeout_secs: f64, format: OutputFormat) -> Result<(), ExitError> {
    let config = crate::config::resolve(None)?;
    let store = RunStore::new(config.runs_directory);
    let run_id = RunId::from_string(run_id);

    let record = poll_until_terminal(&store, &run_id, Some(Duration::from_secs_f64(timeout_secs))).await?;
    output::format_or_json(format, &record, || println!("{} {}", record.id, record.status))?;
    Ok(())
}

/// Poll `store` at a fixed 25ms interval until `run_id` is terminal, or
/// `timeout` elapses (`None` polls forever — used by `run --sync`).
pub(crate) async fn poll_until_terminal(
    store: &RunStore,
    run_id: &RunId,
    timeout: Option<Duration>,
) -> Result<RunRecord, Error> {
    const POLL_INTERVAL: Duration = Duration::from_millis(25);
    let start = tokio::time::Instant::now();
    loop {
        let record = store.get_run(run_id)?;
        if record.status.is_terminal() {
            return Ok(record);
        }
        match timeout {
            Some(timeout) => {
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
            None => tokio::time::sleep(POLL_INTERVAL).await,
        }
    }
}
