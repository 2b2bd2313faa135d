// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run and spawn identifiers.
//!
//! `RunId` is `run_<uuid-v4>`, generated once at submission time. `SpawnId`
//! is `spawn_<n>` where `n` is a per-run monotonically increasing counter
//! starting at 1, allocated by the engine as a run executes. Both are opaque
//! non-empty strings to every other component — nothing downstream parses
//! their internal structure.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generate a new random run id: `run_<uuid-v4>`.
    pub fn new() -> Self {
        Self(format!("run_{}", uuid::Uuid::new_v4()))
    }

    /// Wrap an existing id string (e.g. parsed from a CLI argument or a
    /// persisted record). Does not validate the `run_` prefix — ids from
    /// older schema versions or external tooling are accepted as-is.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for RunId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpawnId(String);

impl SpawnId {
    /// Construct the spawn id for the `n`th spawn of a run (1-indexed).
    pub fn from_counter(n: u64) -> Self {
        Self(format!("spawn_{n}"))
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpawnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpawnId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for SpawnId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for SpawnId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for SpawnId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Monotonically increasing per-run counter used to allocate [`SpawnId`]s.
///
/// Seeded from the number of `spawn:start` events already observed in the
/// persisted log on resumption (spec.md §4.5 step 4), so re-entering a run
/// never reissues a spawn id.
#[derive(Debug, Default)]
pub struct SpawnCounter(std::sync::atomic::AtomicU64);

impl SpawnCounter {
    pub fn starting_at(count: u64) -> Self {
        Self(std::sync::atomic::AtomicU64::new(count))
    }

    /// Allocate the next spawn id.
    pub fn next(&self) -> SpawnId {
        let n = self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        SpawnId::from_counter(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_has_prefix() {
        let id = RunId::new();
        assert!(id.as_str().starts_with("run_"));
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn spawn_counter_starts_at_one() {
        let counter = SpawnCounter::starting_at(0);
        assert_eq!(counter.next().as_str(), "spawn_1");
        assert_eq!(counter.next().as_str(), "spawn_2");
    }

    #[test]
    fn spawn_counter_resumes_from_seed() {
        let counter = SpawnCounter::starting_at(3);
        assert_eq!(counter.next().as_str(), "spawn_4");
    }
}
