// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unified error surface for the core (spec.md §7). Every other crate's
//! fallible operation ultimately resolves to one of these variants; CLI-level
//! presentation (exit codes, `anyhow` context) is layered on top in `mill-cli`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("persistence error at {path}: {message}")]
    Persistence { path: PathBuf, message: String },

    #[error("run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("lifecycle invariant violated for run {run_id}: {message}")]
    LifecycleInvariant { run_id: String, message: String },

    #[error("unknown driver {requested:?}, available: {available:?}")]
    DriverRegistry {
        requested: Option<String>,
        available: Vec<String>,
    },

    #[error("unknown executor {requested:?}, available: {available:?}")]
    ExecutorRegistry {
        requested: Option<String>,
        available: Vec<String>,
    },

    #[error("program execution failed for run {run_id}: {message}")]
    ProgramExecution { run_id: String, message: String },

    #[error("program host error for run {run_id}: {message}")]
    ProgramHost { run_id: String, message: String },

    #[error("wait on run {run_id} timed out after {timeout_millis}ms: {message}")]
    WaitTimeout {
        run_id: String,
        timeout_millis: u64,
        message: String,
    },
}

impl Error {
    pub fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn run_not_found(run_id: impl Into<String>) -> Self {
        Error::RunNotFound {
            run_id: run_id.into(),
        }
    }

    pub fn lifecycle_invariant(run_id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::LifecycleInvariant {
            run_id: run_id.into(),
            message: message.into(),
        }
    }

    pub fn program_execution(run_id: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ProgramExecution {
            run_id: run_id.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
