// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mill inspect`: `ref` is `runId` or `runId.spawnId` (spec.md §4.5
//! `inspect`, §6). Mirrors `Engine::inspect`'s two-shape result directly
//! against the store.

use mill_core::{EventPayload, MillEvent, RunId, RunRecord, RunResult, SpawnId, SpawnResult};
use mill_store::RunStore;
use serde::Serialize;

use crate::exit_error::ExitError;
use crate::output::{self, OutputFormat};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunInspection {
    run: RunRecord,
    events: Vec<MillEvent>,
    result: Option<RunResult>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpawnInspection {
    run_id: String,
    spawn_id: String,
    events: Vec<MillEvent>,
    result: Option<SpawnResult>,
}

pub fn execute(reference: String, session: bool, format: OutputFormat) -> Result<(), ExitError> {
    let config = crate::config::resolve(None)?;
    let store = RunStore::new(config.runs_directory);

    let (run_id_raw, spawn_id_raw) = match reference.split_once('.') {
        Some((run, spawn)) => (run.to_string(), Some(spawn.to_string())),
        None => (reference.clone(), None),
    };
    let run_id = RunId::from_string(run_id_raw);
    let events = store.read_events(&run_id)?;

    match spawn_id_raw {
        None => {
            if session {
                return Err(ExitError::new(1, "--session requires a runId.spawnId reference"));
            }
            let run = store.get_run(&run_id)?;
            let result = store.get_result(&run_id)?;
            let payload = RunInspection { run: run.clone(), events: events.clone(), result };
            output::format_or_json(format, &payload, || {
                println!("{} {}", run.id, run.status);
                for event in &events {
                    println!("  #{} {}", event.sequence, event.payload.type_name());
                }
            })?;
        }
        Some(spawn_id_raw) => {
            let spawn_id = SpawnId::from_string(spawn_id_raw);
            let scoped: Vec<MillEvent> =
                events.into_iter().filter(|e| e.payload.spawn_id() == Some(&spawn_id)).collect();
            let result = scoped.iter().find_map(|e| match &e.payload {
                EventPayload::SpawnComplete { result, .. } => Some(result.clone()),
                _ => None,
            });

            if session {
                let session_ref = result
                    .as_ref()
                    .map(|r| r.session_ref.clone())
                    .ok_or_else(|| ExitError::new(1, "spawn has no recorded sessionRef yet"))?;
                println!("{session_ref}");
                return Ok(());
            }

            let payload = SpawnInspection {
                run_id: run_id.to_string(),
                spawn_id: spawn_id.to_string(),
                events: scoped.clone(),
                result,
            };
            output::format_or_json(format, &payload, || {
                println!("{run_id}.{spawn_id}");
                for event in &scoped {
                    println!("  #{} {}", event.sequence, event.payload.type_name());
                }
            })?;
        }
    }
    Ok(())
}
