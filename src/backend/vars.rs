//! Shared variable store that a running backend writes into and the
//! accessors read from.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub const STATUS_NOT_STARTED: &str = "notStarted";
pub const ERRMSG_NOT_RUN: &str = "Test not run.";
pub const ERRMSG_IN_PROGRESS: &str = "Test in progress.";
pub const HOST_UNKNOWN: &str = "unknown";

/// One line of output from an external NDT client.
///
/// Each line is a JSON object carrying exactly one kind of update.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BackendMessage {
    Var {
        var: String,
        value: serde_json::Value,
    },
    Status {
        status: String,
    },
    ErrMsg {
        errmsg: String,
    },
    Host {
        host: String,
    },
    SpeedLimit {
        spd_limit: serde_json::Value,
    },
    Diagnosis {
        diagnosis: String,
    },
}

impl BackendMessage {
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }
}

/// Render a JSON scalar the way the client reported it.
fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    status: String,
    errmsg: String,
    host: String,
    spd_limit: String,
    diagnosis: String,
    vars: HashMap<String, String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            status: STATUS_NOT_STARTED.to_string(),
            errmsg: ERRMSG_NOT_RUN.to_string(),
            host: HOST_UNKNOWN.to_string(),
            spd_limit: String::new(),
            diagnosis: String::new(),
            vars: HashMap::new(),
        }
    }
}

/// Cloneable handle over the latest values a backend has reported.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    inner: Arc<RwLock<Snapshot>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, message: BackendMessage) {
        let mut snap = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match message {
            BackendMessage::Var { var, value } => {
                snap.vars.insert(var, scalar_to_string(&value));
            }
            BackendMessage::Status { status } => snap.status = status,
            BackendMessage::ErrMsg { errmsg } => snap.errmsg = errmsg,
            BackendMessage::Host { host } => snap.host = host,
            BackendMessage::SpeedLimit { spd_limit } => {
                snap.spd_limit = scalar_to_string(&spd_limit)
            }
            BackendMessage::Diagnosis { diagnosis } => snap.diagnosis = diagnosis,
        }
    }

    pub fn set_status(&self, status: impl Into<String>) {
        self.apply(BackendMessage::Status {
            status: status.into(),
        });
    }

    pub fn set_errmsg(&self, errmsg: impl Into<String>) {
        self.apply(BackendMessage::ErrMsg {
            errmsg: errmsg.into(),
        });
    }

    pub fn set_host(&self, host: impl Into<String>) {
        self.apply(BackendMessage::Host { host: host.into() });
    }

    pub fn set_var(&self, name: impl Into<String>, value: impl Into<String>) {
        self.apply(BackendMessage::Var {
            var: name.into(),
            value: serde_json::Value::String(value.into()),
        });
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        match self.inner.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    pub fn status(&self) -> String {
        self.read(|s| s.status.clone())
    }

    pub fn errmsg(&self) -> String {
        self.read(|s| s.errmsg.clone())
    }

    pub fn host(&self) -> String {
        self.read(|s| s.host.clone())
    }

    pub fn spd_limit(&self) -> String {
        self.read(|s| s.spd_limit.clone())
    }

    pub fn diagnosis(&self) -> String {
        self.read(|s| s.diagnosis.clone())
    }

    pub fn var(&self, name: &str) -> Option<String> {
        self.read(|s| s.vars.get(name).cloned())
    }
}
