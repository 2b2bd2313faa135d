// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Extensions (contract only, spec.md §4.7). An extension contributes a
//! `setup` hook run once before `run:start`, an `onEvent` hook run for every
//! tier-1 event except `extension:error`, and named API methods the program
//! host bridge dispatches `extension` requests into. All three are soft: a
//! failing hook becomes `extension:error` and the run continues.

use async_trait::async_trait;
use mill_core::{MillEvent, RunId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Context handed to every extension hook and API method invocation.
#[derive(Debug, Clone)]
pub struct ExtensionContext {
    pub run_id: RunId,
    pub run_directory: PathBuf,
}

#[async_trait]
pub trait ExtensionSetup: Send + Sync {
    async fn setup(&self, context: &ExtensionContext) -> Result<(), String>;
}

#[async_trait]
pub trait ExtensionOnEvent: Send + Sync {
    async fn on_event(&self, event: &MillEvent, context: &ExtensionContext) -> Result<(), String>;
}

#[async_trait]
pub trait ExtensionApiMethod: Send + Sync {
    async fn call(&self, args: serde_json::Value, context: &ExtensionContext) -> Result<serde_json::Value, String>;
}

/// One registered extension: `{name, setup?, onEvent?, api?}` (spec.md §4.7).
#[derive(Clone)]
pub struct ExtensionRegistration {
    pub name: String,
    pub setup: Option<Arc<dyn ExtensionSetup>>,
    pub on_event: Option<Arc<dyn ExtensionOnEvent>>,
    pub api: HashMap<String, Arc<dyn ExtensionApiMethod>>,
}

impl ExtensionRegistration {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), setup: None, on_event: None, api: HashMap::new() }
    }

    pub fn with_setup(mut self, setup: Arc<dyn ExtensionSetup>) -> Self {
        self.setup = Some(setup);
        self
    }

    pub fn with_on_event(mut self, on_event: Arc<dyn ExtensionOnEvent>) -> Self {
        self.on_event = Some(on_event);
        self
    }

    pub fn with_api_method(mut self, method_name: impl Into<String>, method: Arc<dyn ExtensionApiMethod>) -> Self {
        self.api.insert(method_name.into(), method);
        self
    }
}
