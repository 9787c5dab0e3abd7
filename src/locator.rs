//! Server discovery
//!
//! A single lookup against the discovery service is fired as soon as the
//! locator is built. The answer is published through a watch channel so the
//! UI loop can read it without blocking. There is no retry.

use serde::Deserialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Outcome of the discovery lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerDescriptor {
    /// The request has not completed yet.
    Unresolved,
    Resolved(String),
    /// Non-200 response, malformed body or transport error.
    Failed,
}

impl ServerDescriptor {
    pub fn host(&self) -> Option<&str> {
        match self {
            ServerDescriptor::Resolved(host) if !host.is_empty() => Some(host),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ServerDescriptor::Unresolved)
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    fqdn: String,
}

pub struct ServerLocator {
    rx: watch::Receiver<ServerDescriptor>,
    task: JoinHandle<()>,
}

impl ServerLocator {
    /// Start the lookup against `lookup_url` in the background.
    pub fn spawn(lookup_url: String) -> Self {
        let (tx, rx) = watch::channel(ServerDescriptor::Unresolved);
        let task = tokio::spawn(async move {
            let descriptor = match lookup(&lookup_url).await {
                Ok(fqdn) => {
                    info!("Using NDT server: {}", fqdn);
                    ServerDescriptor::Resolved(fqdn)
                }
                Err(e) => {
                    warn!("Server lookup failed: {}", e);
                    ServerDescriptor::Failed
                }
            };
            let _ = tx.send(descriptor);
        });

        Self { rx, task }
    }

    /// A locator that already knows its answer. Used when the host is given
    /// explicitly or no lookup is wanted.
    pub fn fixed(descriptor: ServerDescriptor) -> Self {
        let (_tx, rx) = watch::channel(descriptor);
        Self {
            rx,
            task: tokio::spawn(async {}),
        }
    }

    /// Current state of the lookup, without waiting.
    pub fn descriptor(&self) -> ServerDescriptor {
        self.rx.borrow().clone()
    }

    /// Wait until the lookup has an answer.
    pub async fn resolved(&mut self) -> ServerDescriptor {
        let waited = self
            .rx
            .wait_for(|d| !d.is_pending())
            .await
            .map(|d| d.clone());
        match waited {
            Ok(d) => d,
            Err(_) => self.rx.borrow().clone(),
        }
    }
}

impl Drop for ServerLocator {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Perform one discovery request and return the fully-qualified hostname.
pub async fn lookup(lookup_url: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .build()?;

    let response = client.get(lookup_url).send().await?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(Error::Discovery {
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    let parsed: LookupResponse = serde_json::from_str(&body)?;
    if parsed.fqdn.is_empty() {
        return Err(Error::NoServerAvailable);
    }
    Ok(parsed.fqdn)
}
