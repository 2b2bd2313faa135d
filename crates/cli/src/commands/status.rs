// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mill status`: print the current `RunRecord` for a run.

use mill_core::RunId;
use mill_store::RunStore;

use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};

pub fn execute(run_id: String, format: OutputFormat) -> Result<(), ExitError> {
    let config = crate::config::resolve(None)?;
    let store = RunStore::new(config.runs_directory);
    let record = store.get_run(&RunId::from_string(run_id))?;
    output::format_or_json(format, &record, || {
        println!("{} {} {}", record.id, record.status, record.updated_at);
    })?;
    Ok(())
}
