// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment access for the worker (grounded on the teacher's
//! `oj-daemon::env` module — one function per variable, `std::env::var().ok()`
//! with a documented default, never scattered `env::var` calls). spec.md §6
//! reserves `MILL_RUN_DEPTH` for the recursion guard; the driver/executor
//! command lines below are this crate's own ambient configuration, not part
//! of the core's data model.

/// Argv for the local-subprocess driver (spec.md GLOSSARY "Driver"). Default
/// matches the bridge's own default runtime — a `node` wrapper script the
/// operator is expected to provide on `PATH`.
pub fn local_driver_command() -> Vec<String> {
    std::env::var("MILL_LOCAL_DRIVER_COMMAND")
        .ok()
        .map(|raw| raw.split_whitespace().map(str::to_string).collect())
        .unwrap_or_else(|| vec!["mill-driver-local".to_string()])
}

/// Websocket endpoint for the remote driver.
pub fn remote_driver_endpoint() -> String {
    std::env::var("MILL_REMOTE_DRIVER_ENDPOINT")
        .unwrap_or_else(|_| "ws://127.0.0.1:8787/mill-driver".to_string())
}

/// Argv prefix the generated program host is appended to (spec.md §4.6
/// bootstrap). Default is the teacher's own assumption that a `node`
/// executable is on `PATH`.
pub fn executor_runtime_command() -> Vec<String> {
    std::env::var("MILL_EXECUTOR_COMMAND")
        .ok()
        .map(|raw| raw.split_whitespace().map(str::to_string).collect())
        .unwrap_or_else(|| vec!["node".to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_non_empty() {
        assert!(!local_driver_command().is_empty());
        assert!(!executor_runtime_command().is_empty());
        assert!(!remote_driver_endpoint().is_empty());
    }
}
