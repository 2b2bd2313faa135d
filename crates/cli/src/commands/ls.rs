// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mill ls`: enumerate runs sorted by `createdAt` descending.

use mill_core::RunStatus;
use mill_store::RunStore;

use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};

pub fn execute(status: Option<String>, format: OutputFormat) -> Result<(), ExitError> {
    let config = crate::config::resolve(None)?;
    let store = RunStore::new(config.runs_directory);
    let status_filter = status.map(|raw| parse_status(&raw)).transpose()?;
    let records = store.list_runs(status_filter)?;
    output::handle_list(format, &records, "no runs", |record| {
        println!("{} {} {}", record.id, record.status, record.created_at);
    })?;
    Ok(())
}

fn parse_status(raw: &str) -> Result<RunStatus, ExitError> {
    match raw {
        "pending" => Ok(RunStatus::Pending),
        "running" => Ok(RunStatus::Running),
        "complete" => Ok(RunStatus::Complete),
        "failed" => Ok(RunStatus::Failed),
        "cancelled" => Ok(RunStatus::Cancelled),
        other => Err(ExitError::new(1, format!("unknown --status {other:?}"))),
    }
}
