// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mill`: the CLI façade (C8) and the hidden `_worker` entry point (C7).
//! Talks to runs only through the persisted store and a detached worker
//! process — never by constructing a [`mill_engine::Engine`] directly (that
//! would require wiring a driver into a short-lived CLI invocation for no
//! benefit). See DESIGN.md for the full rationale.

mod commands;
mod config;
mod exit_error;
mod output;
mod pidtree;

use clap::{Parser, Subcommand};
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "mill", about = "Local orchestration runtime for agent-spawning programs")]
struct Cli {
    /// Emit machine-readable JSON on stdout instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a program for execution, optionally blocking until terminal.
    Run {
        program_path: std::path::PathBuf,
        #[arg(long)]
        sync: bool,
        #[arg(long)]
        driver: Option<String>,
        #[arg(long)]
        executor: Option<String>,
        #[arg(long = "runs-dir")]
        runs_dir: Option<std::path::PathBuf>,
        #[arg(long = "meta-json")]
        meta_json: Option<String>,
    },
    /// Print the current RunRecord for a run.
    Status { run_id: String },
    /// Block until a run reaches a terminal status or the timeout elapses.
    Wait {
        run_id: String,
        #[arg(long)]
        timeout: f64,
    },
    /// Stream events for one run or across all runs.
    Watch {
        #[arg(long)]
        run: Option<String>,
        #[arg(long = "since-time")]
        since_time: Option<String>,
        #[arg(long, default_value = "events")]
        channel: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        spawn: Option<String>,
    },
    /// Cancel a run; idempotent.
    Cancel { run_id: String },
    /// Enumerate runs sorted by createdAt descending.
    Ls {
        #[arg(long)]
        status: Option<String>,
    },
    /// Inspect a run or one spawn within it (`runId` or `runId.spawnId`).
    Inspect {
        #[arg(name = "ref")]
        reference: String,
        #[arg(long)]
        session: bool,
    },
    /// Write a starter config file.
    Init {
        #[arg(long)]
        global: bool,
    },
    /// Private: entry point of the detached worker (spec.md §6 `_worker`).
    #[command(name = "_worker", hide = true)]
    Worker {
        #[arg(long = "run-id")]
        run_id: String,
        #[arg(long)]
        program: String,
        #[arg(long = "runs-dir")]
        runs_dir: std::path::PathBuf,
        #[arg(long)]
        driver: Option<String>,
        #[arg(long)]
        executor: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let format = if cli.json { OutputFormat::Json } else { OutputFormat::Text };

    let result = match cli.command {
        Command::Run { program_path, sync, driver, executor, runs_dir, meta_json } => {
            commands::run::execute(program_path, sync, driver, executor, runs_dir, meta_json, format)
                .await
        }
        Command::Status { run_id } => commands::status::execute(run_id, format),
        Command::Wait { run_id, timeout } => commands::wait::execute(run_id, timeout, format).await,
        Command::Watch { run, since_time, channel, source, spawn } => {
            commands::watch::execute(run, since_time, channel, source, spawn, format).await
        }
        Command::Cancel { run_id } => commands::cancel::execute(run_id, format),
        Command::Ls { status } => commands::ls::execute(status, format),
        Command::Inspect { reference, session } => commands::inspect::execute(reference, session, format),
        Command::Init { global } => commands::init::execute(global),
        Command::Worker { run_id, program, runs_dir, driver, executor } => {
            commands::worker::execute(run_id, program, runs_dir, driver, executor).await
        }
    };

    if let Err(err) = result {
        eprintln!("error: {}", err.message);
        std::process::exit(err.code);
    }
}

impl From<anyhow::Error> for ExitError {
    fn from(err: anyhow::Error) -> Self {
        ExitError::new(1, err.to_string())
    }
}

impl From<mill_core::Error> for ExitError {
    fn from(err: mill_core::Error) -> Self {
        let code = if matches!(err, mill_core::Error::WaitTimeout { .. }) { 2 } else { 1 };
        ExitError::new(code, err.to_string())
    }
}

impl From<std::io::Error> for ExitError {
    fn from(err: std::io::Error) -> Self {
        ExitError::new(1, err.to_string())
    }
}

impl From<serde_json::Error> for ExitError {
    fn from(err: serde_json::Error) -> Self {
        ExitError::new(1, err.to_string())
    }
}
