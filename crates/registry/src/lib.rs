// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mill-registry: name → capability resolution for drivers and executors
//! (spec.md §4.4). One generic [`Registry`] backs both the driver catalog
//! and the executor catalog — the only difference is which `mill_core::Error`
//! variant an unknown-name lookup produces, selected by [`RegistryKind`].

use mill_core::Error;
use std::collections::BTreeMap;

/// Which typed "unknown name" error a [`Registry`] raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Driver,
    Executor,
}

/// One named entry in a registry. `runtime` is `None` for a name that is
/// declared (e.g. present in configuration) but not wired to an executable
/// implementation — spec.md §4.4: "drivers without a `runtime` field also
/// fail (configuration is declarative but unexecutable)".
pub struct Registration<T> {
    pub name: String,
    pub runtime: Option<T>,
}

impl<T> Registration<T> {
    pub fn new(name: impl Into<String>, runtime: T) -> Self {
        Self { name: name.into(), runtime: Some(runtime) }
    }

    pub fn unexecutable(name: impl Into<String>) -> Self {
        Self { name: name.into(), runtime: None }
    }
}

/// A resolved entry: the canonical name (as stored, not necessarily what the
/// caller requested) plus its runtime.
pub struct Resolved<'a, T> {
    pub name: &'a str,
    pub runtime: &'a T,
}

/// A name → [`Registration`] catalog with a default name and deterministic
/// (sorted) catalog ordering for error reporting.
pub struct Registry<T> {
    kind: RegistryKind,
    entries: BTreeMap<String, Registration<T>>,
    default_name: String,
}

impl<T> Registry<T> {
    pub fn new(
        kind: RegistryKind,
        entries: impl IntoIterator<Item = Registration<T>>,
        default_name: impl Into<String>,
    ) -> Self {
        let entries = entries.into_iter().map(|r| (r.name.clone(), r)).collect();
        Self { kind, entries, default_name: default_name.into() }
    }

    /// Sorted catalog names (spec.md §4.4: "deterministic catalog ordering").
    pub fn available_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Resolve `requested`, falling back to the registry's default name when
    /// `None`. Fails with a registry error carrying the requested name and
    /// the sorted available-names list if the name is unknown, or with a
    /// `Config` error if the name is known but declared without a runtime.
    pub fn resolve(&self, requested: Option<&str>) -> Result<Resolved<'_, T>, Error> {
        let name = requested.unwrap_or(self.default_name.as_str());
        let registration = self.entries.get(name).ok_or_else(|| self.unknown_name_error(requested))?;
        let runtime = registration.runtime.as_ref().ok_or_else(|| {
            Error::Config(format!("{} '{name}' is configured but has no executable runtime", self.kind_label()))
        })?;
        Ok(Resolved { name: registration.name.as_str(), runtime })
    }

    fn kind_label(&self) -> &'static str {
        match self.kind {
            RegistryKind::Driver => "driver",
            RegistryKind::Executor => "executor",
        }
    }

    fn unknown_name_error(&self, requested: Option<&str>) -> Error {
        let available = self.available_names();
        match self.kind {
            RegistryKind::Driver => {
                Error::DriverRegistry { requested: requested.map(String::from), available }
            }
            RegistryKind::Executor => {
                Error::ExecutorRegistry { requested: requested.map(String::from), available }
            }
        }
    }
}
