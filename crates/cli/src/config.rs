// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI-level config resolution. The cascading file-discovery walk (cwd →
//! repo root → home → defaults) is deliberately out of scope (spec.md §1) —
//! this just applies the `runsDirectory` precedence spec.md §4.9 step 1
//! names (`--runs-dir` > `$HOME/.mill/runs` > `<cwd>/.mill/runs`) and reads
//! the `MILL_RUN_DEPTH` recursion-guard environment variable (spec.md §5).

use mill_core::EngineConfig;
use std::path::PathBuf;

const RUN_DEPTH_ENV: &str = "MILL_RUN_DEPTH";

/// Build the engine config for this invocation, applying the `--runs-dir`
/// override (if any) over the `$HOME`/cwd default.
pub fn resolve(runs_dir_override: Option<PathBuf>) -> anyhow::Result<EngineConfig> {
    let cwd = std::env::current_dir()?;
    let runs_directory = EngineConfig::resolve_runs_directory(runs_dir_override, &cwd);
    Ok(EngineConfig::with_runs_directory(runs_directory))
}

/// The recursion depth this process observed on entry. Unset or
/// unparseable means depth 0 — a top-level submission.
pub fn observed_run_depth() -> u32 {
    std::env::var(RUN_DEPTH_ENV).ok().and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// The depth to propagate to a worker this process launches.
pub fn next_run_depth() -> u32 {
    observed_run_depth() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn observed_depth_defaults_to_zero() {
        std::env::remove_var(RUN_DEPTH_ENV);
        assert_eq!(observed_run_depth(), 0);
        assert_eq!(next_run_depth(), 1);
    }

    #[test]
    #[serial]
    fn observed_depth_reads_env() {
        std::env::set_var(RUN_DEPTH_ENV, "2");
        assert_eq!(observed_run_depth(), 2);
        assert_eq!(next_run_depth(), 3);
        std::env::remove_var(RUN_DEPTH_ENV);
    }

    #[test]
    fn explicit_override_wins() {
        let config = resolve(Some(PathBuf::from("/explicit/runs"))).unwrap();
        assert_eq!(config.runs_directory, PathBuf::from("/explicit/runs"));
    }
}
