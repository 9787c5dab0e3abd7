//! Periodic sampling of backend status while a test runs.
//!
//! The poller only reads; every sample is sent to the UI loop, which owns
//! the session and decides what the sample means. Dropping the handle stops
//! the task, so a new run can never leave an old poller behind.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::app::TestUpdate;
use crate::backend::NdtBackend;
use crate::phase::BackendSignals;

/// Read the error text, status text and remote host in one go.
pub fn sample(backend: &dyn NdtBackend) -> BackendSignals {
    BackendSignals {
        errmsg: backend.errmsg(),
        status: backend.status(),
        host: backend.host(),
    }
}

pub struct PollerHandle {
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Sample `backend` immediately and then every `interval`.
    pub fn spawn(
        backend: Arc<dyn NdtBackend>,
        interval: Duration,
        update_tx: mpsc::Sender<TestUpdate>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let signals = sample(backend.as_ref());
                if update_tx.send(TestUpdate::Poll(signals)).await.is_err() {
                    debug!("Update channel closed, poller exiting");
                    break;
                }
            }
        });

        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
