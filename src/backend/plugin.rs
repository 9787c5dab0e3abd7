//! Plugin fallback backend.
//!
//! Used whenever the websocket client is not available. It carries the
//! fixed embedding parameters of the legacy applet. There is no plugin
//! runtime in a terminal, so a run reports failure through the error text
//! and the poller finishes on the results page.

use tracing::warn;

use super::vars::VariableStore;
use super::{BackendKind, NdtBackend};
use crate::error::Result;

pub const PLUGIN_UNAVAILABLE: &str = "Test failed: plugin runtime unavailable";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub archive: &'static str,
    pub code: &'static str,
    pub width: u16,
    pub height: u16,
}

impl Default for PluginDescriptor {
    fn default() -> Self {
        Self {
            id: "NDT",
            name: "NDT",
            archive: "Tcpbw100.jar",
            code: "edu.internet2.ndt.Tcpbw100.class",
            width: 600,
            height: 10,
        }
    }
}

#[derive(Debug, Default)]
pub struct PluginBackend {
    descriptor: PluginDescriptor,
    store: VariableStore,
}

impl PluginBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

impl NdtBackend for PluginBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Plugin
    }

    fn run_test(&self, host: &str) -> Result<()> {
        warn!(
            "No plugin runtime for {} ({}), cannot test against {}",
            self.descriptor.archive, self.descriptor.code, host
        );
        self.store.set_errmsg(PLUGIN_UNAVAILABLE);
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
