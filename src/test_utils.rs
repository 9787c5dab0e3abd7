//! Test utilities
//!
//! An in-memory backend whose reported values are set directly by the test.

use std::sync::Mutex;

use crate::backend::vars::ERRMSG_IN_PROGRESS;
use crate::backend::{BackendKind, NdtBackend, VariableStore};
use crate::error::Result;

#[derive(Debug)]
pub struct ScriptedBackend {
    kind: BackendKind,
    store: VariableStore,
    started_with: Mutex<Option<String>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            kind: BackendKind::Websocket,
            store: VariableStore::new(),
            started_with: Mutex::new(None),
        }
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle used by the test to change what the backend reports.
    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    /// Host passed to the last `run_test` call.
    pub fn started_with(&self) -> Option<String> {
        self.started_with.lock().ok().and_then(|h| h.clone())
    }
}

impl NdtBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn run_test(&self, host: &str) -> Result<()> {
        if let Ok(mut started) = self.started_with.lock() {
            *started = Some(host.to_string());
        }
        self.store.set_errmsg(ERRMSG_IN_PROGRESS);
        Ok(())
    }

    fn status(&self) -> String {
        self.store.status()
    }

    fn errmsg(&self) -> String {
        self.store.errmsg()
    }

    fn host(&self) -> String {
        self.store.host()
    }

    fn pc_buff_spd_limit(&self) -> String {
        self.store.spd_limit()
    }

    fn ndt_var(&self, name: &str) -> Option<String> {
        self.store.var(name)
    }

    fn diagnosis(&self) -> String {
        self.store.diagnosis()
    }
}
