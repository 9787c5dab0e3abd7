//! Bridge to an external websocket-capable NDT client.
//!
//! The client is started as `<command> --server <host>` and reports progress
//! as one JSON object per stdout line (see [`BackendMessage`]). Every line
//! is folded into a [`VariableStore`] that the accessors read.

use std::process::Stdio;
use std::sync::Mutex;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::vars::{BackendMessage, VariableStore, ERRMSG_IN_PROGRESS};
use super::{BackendKind, NdtBackend};
use crate::error::{Error, Result};

pub const CLIENT_EXITED: &str = "Test failed: client exited";

pub struct BridgeBackend {
    command: String,
    store: VariableStore,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeBackend {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            store: VariableStore::new(),
            task: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &VariableStore {
        &self.store
    }

    /// Owns the child process; the child is killed when this task is
    /// aborted because `kill_on_drop` is set.
    async fn drive(mut child: tokio::process::Child, stdout: ChildStdout, store: VariableStore) {
        read_messages(stdout, &store).await;

        match child.wait().await {
            Ok(status) => info!("NDT client exited with {:?}", status),
            Err(e) => warn!("Error waiting for NDT client: {}", e),
        }

        if !is_terminal_errmsg(&store.errmsg()) {
            store.set_errmsg(CLIENT_EXITED);
        }
    }
}

async fn read_messages(stdout: ChildStdout, store: &VariableStore) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match BackendMessage::parse(&line) {
                    Some(message) => store.apply(message),
                    None => debug!("Ignoring client output: {}", line),
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading NDT client output: {}", e);
                break;
            }
        }
    }
}

fn is_terminal_errmsg(errmsg: &str) -> bool {
    errmsg.contains("completed") || errmsg.contains("failed")
}

impl NdtBackend for BridgeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Websocket
    }

    fn run_test(&self, host: &str) -> Result<()> {
        info!("Spawning NDT client: {} --server {}", self.command, host);

        let mut child = Command::new(&self.command)
            .args(["--server", host])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::backend(format!("failed to start {}: {}", self.command, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::backend("client stdout was not captured"))?;

        self.store.set_errmsg(ERRMSG_IN_PROGRESS);
        let handle = tokio::spawn(Self::drive(child, stdout, self.store.clone()));

        let mut task = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = task.replace(handle) {
            previous.abort();
        }
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

impl Drop for BridgeBackend {
    fn drop(&mut self) {
        let task = match self.task.get_mut() {
            Ok(task) => task,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}
