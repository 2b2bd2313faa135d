// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration. Loading a single TOML file is in scope; the
//! cascading cwd → repo root → home discovery walk is a CLI-level concern
//! left to callers (spec.md §1).

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_driver_name() -> String {
    "local".to_string()
}

fn default_executor_name() -> String {
    "local".to_string()
}

fn default_max_run_depth() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub runs_directory: PathBuf,
    #[serde(default = "default_driver_name")]
    pub driver_name: String,
    #[serde(default = "default_executor_name")]
    pub executor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(default = "default_max_run_depth")]
    pub max_run_depth: u32,
}

impl EngineConfig {
    /// `runs_directory` resolution precedence (spec.md §4.9 step 1):
    /// an explicit override, else `$HOME/.mill/runs`, else `<cwd>/.mill/runs`.
    pub fn resolve_runs_directory(override_dir: Option<PathBuf>, cwd: &Path) -> PathBuf {
        if let Some(dir) = override_dir {
            return dir;
        }
        if let Some(home) = dirs::home_dir() {
            return home.join(".mill").join("runs");
        }
        cwd.join(".mill").join("runs")
    }

    pub fn with_runs_directory(runs_directory: PathBuf) -> Self {
        Self {
            runs_directory,
            driver_name: default_driver_name(),
            executor_name: default_executor_name(),
            default_model: None,
            max_run_depth: default_max_run_depth(),
        }
    }

    /// Load a config from a single TOML file. Does not search for one —
    /// callers decide which file, if any, to pass.
    pub fn load_toml(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::persistence(path, e.to_string()))?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Recursion guard (spec.md §5): submission fails before any worker is
    /// launched if the observed `MILL_RUN_DEPTH` has reached `max_run_depth`.
    pub fn check_recursion_depth(&self, observed_depth: u32) -> Result<(), Error> {
        if observed_depth >= self.max_run_depth {
            return Err(Error::Config(format!(
                "run depth {observed_depth} reached maxRunDepth {}",
                self.max_run_depth
            )));
        }
        Ok(())
    }
}
