// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State shared between [`crate::Engine`] and the per-spawn effect it hands
//! to a [`crate::ProgramExecutor`]: the run store, the observer hub, the
//! clock, and the extension registrations. Bundled behind one `Arc` so
//! constructing a [`crate::executor::SpawnEffect`] for a run is a cheap clone.

use crate::extension::ExtensionRegistration;
use crate::observer::ObserverHub;
use mill_core::{Clock, EventPayload, Error, MillEvent, RunId};
use mill_drivers::DriverRuntime;
use mill_store::RunStore;
use std::sync::Arc;

pub(crate) struct EngineShared {
    pub(crate) store: RunStore,
    pub(crate) hub: Arc<ObserverHub>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) extensions: Vec<ExtensionRegistration>,
    pub(crate) driver: Arc<dyn DriverRuntime>,
    pub(crate) default_model: Option<String>,
    pub(crate) driver_name: String,
    pub(crate) executor_name: String,
}

impl EngineShared {
    /// The engine's "internal helper" (spec.md §4.5): allocate the next
    /// sequence under the store's lock, validate via the lifecycle guard,
    /// append, publish to the hub, then fan out to extension `onEvent`
    /// hooks. Extension failures never fail the emit itself (spec.md §4.7).
    pub(crate) async fn emit(
        &self,
        run_id: &RunId,
        run_directory: &std::path::Path,
        build: impl FnOnce(u64) -> EventPayload,
    ) -> Result<MillEvent, Error> {
        let timestamp = self.clock.iso_now();
        let event = self.store.append_checked(run_id, timestamp, build)?;
        self.hub.publish_tier1(run_id, event.clone());

        if !event.payload.is_extension_error() {
            for extension in &self.extensions {
                let Some(on_event) = &extension.on_event else { continue };
                let context = crate::extension::ExtensionContext {
                    run_id: run_id.clone(),
                    run_directory: run_directory.to_path_buf(),
                };
                if let Err(message) = on_event.on_event(&event, &context).await {
                    let extension_timestamp = self.clock.iso_now();
                    let _ = self.store.append_checked(run_id, extension_timestamp, |sequence| {
                        let _ = sequence;
                        EventPayload::ExtensionError {
                            extension_name: extension.name.clone(),
                            hook: mill_core::ExtensionHook::OnEvent,
                            message: message.clone(),
                        }
                    });
                }
            }
        }

        Ok(event)
    }
}
