// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! C5: the run execution engine, plus the pieces it is built from —
//! the per-spawn effect handed to a program host (`executor`), the
//! in-process pub/sub hub backfilled events stream from (`observer`), and
//! the extension contract (`extension`). `mill-worker` and `mill-bridge`
//! are this crate's callers; `mill-cli` talks to runs only through a
//! worker process, never by constructing an [`Engine`] directly.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod engine;
mod shared;

pub mod executor;
pub mod extension;
pub mod observer;

pub use engine::{Engine, InspectResult, RunSyncRequest, SubmitRequest};
pub use executor::{ProgramExecutor, SpawnEffect};
pub use extension::{
    ExtensionApiMethod, ExtensionContext, ExtensionOnEvent, ExtensionRegistration, ExtensionSetup,
};
pub use observer::{EventStream, GlobalEventStream, IoEventStream, ObserverHub};
