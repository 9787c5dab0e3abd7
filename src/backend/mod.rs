//! Backend handles and the selector that picks one.
//!
//! The measurement itself is done by an external client. A backend only
//! starts that client against a host and exposes what it reports through
//! string accessors. Two implementations exist: a bridge to an external
//! websocket-capable client process, and the legacy plugin fallback.

pub mod bridge;
pub mod plugin;
pub mod vars;

use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::locator::ServerDescriptor;
use crate::settings::Settings;

pub use bridge::BridgeBackend;
pub use plugin::{PluginBackend, PluginDescriptor};
pub use vars::{BackendMessage, VariableStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Websocket,
    Plugin,
}

/// Read surface of a running NDT client.
///
/// All reads are synchronous and never fail. A value the client has not
/// reported is an empty string (or `None` for named variables).
pub trait NdtBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Start measuring against `host`.
    fn run_test(&self, host: &str) -> Result<()>;

    fn status(&self) -> String;
    fn errmsg(&self) -> String;
    fn host(&self) -> String;
    fn pc_buff_spd_limit(&self) -> String;
    fn ndt_var(&self, name: &str) -> Option<String>;
    fn diagnosis(&self) -> String;
}

/// Websocket feasibility probe: the external client must be on `PATH`.
pub fn websocket_supported(client_command: &str) -> bool {
    match which::which(client_command) {
        Ok(path) => {
            debug!("Found NDT client at {}", path.display());
            true
        }
        Err(e) => {
            debug!("NDT client {:?} not usable: {}", client_command, e);
            false
        }
    }
}

pub fn create_backend(kind: BackendKind, settings: &Settings) -> Arc<dyn NdtBackend> {
    match kind {
        BackendKind::Websocket => Arc::new(BridgeBackend::new(settings.client_command.clone())),
        BackendKind::Plugin => Arc::new(PluginBackend::new()),
    }
}

/// Create a backend bound to the discovered host and start it.
///
/// Fails with [`Error::NoServerAvailable`] when discovery has no usable
/// host; in that case nothing is created.
pub fn start_test(
    settings: &Settings,
    descriptor: &ServerDescriptor,
) -> Result<Arc<dyn NdtBackend>> {
    let host = descriptor.host().ok_or(Error::NoServerAvailable)?;

    let kind = if websocket_supported(&settings.client_command) {
        BackendKind::Websocket
    } else {
        BackendKind::Plugin
    };
    info!("Starting {:?} backend against {}", kind, host);

    let backend = create_backend(kind, settings);
    backend.run_test(host)?;
    Ok(backend)
}
