// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `mill init`: write a starter config (spec.md §6 `init`). The config
//! loader's cascading discovery walk is an external collaborator out of
//! scope for this crate (spec.md §1); this just writes the `EngineConfig`
//! defaults as a starting point for a hand-maintained `mill.toml`.

use mill_core::EngineConfig;

use crate::exit_error::ExitError;

pub fn execute(global: bool) -> Result<(), ExitError> {
    let cwd = std::env::current_dir()?;
    let runs_directory = EngineConfig::resolve_runs_directory(None, &cwd);
    let config = EngineConfig::with_runs_directory(runs_directory);
    let toml_text = toml::to_string_pretty(&config).map_err(|e| ExitError::new(1, e.to_string()))?;

    let target = if global {
        let home = dirs::home_dir().ok_or_else(|| ExitError::new(1, "no home directory found"))?;
        std::fs::create_dir_all(&home)?;
        home.join(".mill.toml")
    } else {
        cwd.join("mill.toml")
    };

    if target.exists() {
        return Err(ExitError::new(1, format!("{} already exists", target.display())));
    }
    std::fs::write(&target, toml_text)?;
    eprintln!("wrote {}", target.display());
    Ok(())
}
